//! Turning module exports into the JSON that gets written.
//!
//! | export       | result                                        |
//! |--------------|-----------------------------------------------|
//! | factory      | whatever the factory returns for the data     |
//! | descriptor   | `{...descriptor, ...data}` (shallow, data wins) |
//! | absent       | `null`                                        |
//!
//! `null` means "skip": the pattern writes no asset.

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::RuntimeData;
use crate::module::ExportedValue;

/// Failure while producing or serializing a value.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// A factory failed while running
    #[error("factory failed: {0}")]
    Invoke(String),
    /// The value cannot be represented as JSON
    #[error("value is not JSON-representable: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// Resolve an export into the value to emit.
pub fn materialize(
    exported: &ExportedValue,
    data: Option<&RuntimeData>,
) -> Result<Value, MaterializeError> {
    match exported {
        ExportedValue::Factory(factory) => factory.call(data),
        ExportedValue::Descriptor(descriptor) => Ok(merge_descriptor(descriptor, data)),
        ExportedValue::Absent => Ok(Value::Null),
    }
}

/// Right-biased shallow merge of runtime data over a descriptor.
///
/// Colliding keys keep the descriptor's position; new keys follow the
/// descriptor's keys in data order.
pub fn merge_descriptor(descriptor: &Map<String, Value>, data: Option<&RuntimeData>) -> Value {
    let mut merged = descriptor.clone();
    if let Some(data) = data {
        for (key, value) in data {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

/// Serialize the way `JSON.stringify(value, null, 2)` does.
///
/// Two-space indentation, keys in stored order, no trailing newline, and
/// numbers printed as JavaScript prints them (`1.0` is `1`, `1e20` is
/// `100000000000000000000`, `1e-7` stays `1e-7`).
pub fn to_json_text(value: &Value) -> Result<String, MaterializeError> {
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, StringifyFormatter::default());
    value.serialize(&mut serializer).map_err(MaterializeError::Serialization)?;
    // serde_json only writes UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Largest integer a JavaScript number holds exactly.
const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// Pretty printing with ECMAScript `Number.prototype.toString` numbers.
#[derive(Default)]
struct StringifyFormatter {
    pretty: PrettyFormatter<'static>,
}

impl Formatter for StringifyFormatter {
    fn write_i64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: i64) -> io::Result<()> {
        if value.unsigned_abs() > MAX_SAFE_INTEGER {
            return writer.write_all(js_number(value as f64).as_bytes());
        }
        self.pretty.write_i64(writer, value)
    }

    fn write_u64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: u64) -> io::Result<()> {
        if value > MAX_SAFE_INTEGER {
            return writer.write_all(js_number(value as f64).as_bytes());
        }
        self.pretty.write_u64(writer, value)
    }

    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(js_number(value).as_bytes())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object_value(writer)
    }
}

/// Format a finite number like `Number.prototype.toString`.
///
/// Uses the shortest round-trip digits; plain decimal notation for decimal
/// exponents in `[-7, 21)`, exponent notation outside it.
fn js_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return "null".to_string();
    }

    let sign = if value < 0.0 { "-" } else { "" };
    // `{:e}` gives the shortest digits, e.g. `1.2345e20`
    let scientific = format!("{:e}", value.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exponent + 1;

    let body = if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        format!("{}.{}", &digits[..n as usize], &digits[n as usize..])
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let exp_sign = if n - 1 < 0 { '-' } else { '+' };
        let exp = (n - 1).abs();
        if k == 1 {
            format!("{}e{}{}", digits, exp_sign, exp)
        } else {
            format!("{}.{}e{}{}", &digits[..1], &digits[1..], exp_sign, exp)
        }
    };
    format!("{}{}", sign, body)
}

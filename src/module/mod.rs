//! Task descriptor modules
//!
//! A module is a source file (or a registered native factory) that exports
//! either a factory or a descriptor. The export shape is decided once, when
//! the module is loaded, and carried as an [`ExportedValue`].
//!
//! - `.json`, `.json5` and `.toml` files are parsed as data: a top-level
//!   object becomes a [`ExportedValue::Descriptor`], anything else is
//!   [`ExportedValue::Absent`].
//! - Files whose extension has a configured interpreter become
//!   [`CommandFactory`] exports.
//! - Native factories are registered on the resolver by path.

pub mod error;
pub mod loader;
pub mod resolver;

pub use error::ModuleError;
pub use loader::{CommandFactory, ModuleLoader};
pub use resolver::ModuleResolver;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::RuntimeData;
use crate::materialize::MaterializeError;

/// A callable export: takes the runtime data (if any) and returns a value.
pub trait Factory: Send + Sync {
    /// Build the value. `Value::Null` means "nothing to emit".
    fn call(&self, data: Option<&RuntimeData>) -> Result<Value, MaterializeError>;
}

impl<F> Factory for F
where
    F: Fn(Option<&RuntimeData>) -> Result<Value, MaterializeError> + Send + Sync,
{
    fn call(&self, data: Option<&RuntimeData>) -> Result<Value, MaterializeError> {
        self(data)
    }
}

/// Wrap a closure producing any `Serialize` type as a [`Factory`].
///
/// Conversion failures surface as [`MaterializeError::Serialization`].
pub fn serde_factory<T, F>(f: F) -> Arc<dyn Factory>
where
    T: Serialize,
    F: Fn(Option<&RuntimeData>) -> T + Send + Sync + 'static,
{
    Arc::new(move |data: Option<&RuntimeData>| {
        serde_json::to_value(f(data)).map_err(MaterializeError::Serialization)
    })
}

/// The value a module exports.
#[derive(Clone)]
pub enum ExportedValue {
    /// Invoked with the runtime data; solely responsible for using it
    Factory(Arc<dyn Factory>),
    /// Merged with the runtime data
    Descriptor(serde_json::Map<String, Value>),
    /// Nothing usable was exported
    Absent,
}

impl ExportedValue {
    /// Classify a parsed document.
    pub fn from_document(value: Value) -> Self {
        match value {
            Value::Object(map) => ExportedValue::Descriptor(map),
            _ => ExportedValue::Absent,
        }
    }

    /// Short name of the export shape.
    pub fn kind(&self) -> &'static str {
        match self {
            ExportedValue::Factory(_) => "factory",
            ExportedValue::Descriptor(_) => "descriptor",
            ExportedValue::Absent => "absent",
        }
    }

    /// Whether this export can be invoked.
    pub fn is_factory(&self) -> bool {
        matches!(self, ExportedValue::Factory(_))
    }
}

impl fmt::Debug for ExportedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportedValue::Factory(_) => f.write_str("Factory(..)"),
            ExportedValue::Descriptor(map) => f.debug_tuple("Descriptor").field(map).finish(),
            ExportedValue::Absent => f.write_str("Absent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_document_object_is_descriptor() {
        let exported = ExportedValue::from_document(json!({"version": "0.0.1"}));
        assert_eq!(exported.kind(), "descriptor");
        assert!(!exported.is_factory());
    }

    #[test]
    fn test_from_document_other_values_are_absent() {
        for value in [json!(null), json!([1, 2]), json!("task"), json!(3), json!(true)] {
            assert_eq!(ExportedValue::from_document(value).kind(), "absent");
        }
    }

    #[test]
    fn test_closure_factory_receives_data() {
        let factory = |data: Option<&RuntimeData>| -> Result<Value, MaterializeError> {
            Ok(json!({ "has_data": data.is_some() }))
        };
        let mut data = RuntimeData::new();
        data.insert("k".to_string(), json!(1));

        assert_eq!(Factory::call(&factory, Some(&data)).unwrap(), json!({"has_data": true}));
        assert_eq!(Factory::call(&factory, None).unwrap(), json!({"has_data": false}));
    }

    #[test]
    fn test_serde_factory_serializes_structs() {
        #[derive(Serialize)]
        struct Conf {
            version: &'static str,
        }

        let factory = serde_factory(|_| Conf { version: "0.0.1" });
        assert_eq!(factory.call(None).unwrap(), json!({"version": "0.0.1"}));
    }

    #[test]
    fn test_serde_factory_reports_unrepresentable_values() {
        use std::collections::HashMap;

        // JSON object keys must be strings
        let factory = serde_factory(|_| HashMap::from([((1, 2), "pair")]));
        assert!(matches!(factory.call(None), Err(MaterializeError::Serialization(_))));
    }

    #[test]
    fn test_debug_hides_factory_body() {
        let exported = ExportedValue::Factory(serde_factory(|_| 1));
        assert_eq!(format!("{:?}", exported), "Factory(..)");
        assert_eq!(format!("{:?}", ExportedValue::Absent), "Absent");
    }
}

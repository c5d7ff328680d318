//! Loaders turning module files into exported values.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use serde_json::Value;

use super::{ExportedValue, Factory, ModuleError};
use crate::config::RuntimeData;
use crate::materialize::MaterializeError;

/// Extensions parsed as data documents.
pub const DATA_EXTENSIONS: [&str; 3] = ["json", "json5", "toml"];

/// Parse a data document, choosing the syntax from the file extension.
///
/// `.json` is strict JSON (integers past `u64` become floats), `.toml` is
/// TOML, and everything else goes through JSON5.
pub fn parse_document(path: &Path, text: &str) -> Result<Value, String> {
    match extension_of(path).as_str() {
        "json" => serde_json::from_str::<Value>(text).map_err(|e| e.to_string()),
        "toml" => {
            let table = toml::from_str::<toml::Table>(text).map_err(|e| e.to_string())?;
            Ok(toml_to_json(toml::Value::Table(table)))
        }
        _ => json5::from_str::<Value>(text).map_err(|e| e.to_string()),
    }
}

/// Structural TOML to JSON conversion. Datetimes become their RFC 3339 text.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            Value::Object(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect())
        }
    }
}

/// Lowercased extension, empty when the path has none.
pub(crate) fn extension_of(path: &Path) -> String {
    path.extension().map(|e| e.to_string_lossy().to_lowercase()).unwrap_or_default()
}

/// Loads resolved module files.
#[derive(Debug, Clone, Default)]
pub struct ModuleLoader {
    /// Extension to interpreter command
    interpreters: BTreeMap<String, Vec<String>>,
}

impl ModuleLoader {
    /// Create a loader that only understands data documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run files with these extensions through an interpreter.
    pub fn with_interpreters(mut self, interpreters: BTreeMap<String, Vec<String>>) -> Self {
        self.interpreters = interpreters;
        self
    }

    /// Whether a file with this extension can be loaded.
    pub fn handles(&self, extension: &str) -> bool {
        self.interpreters.contains_key(extension) || DATA_EXTENSIONS.contains(&extension)
    }

    /// Extensions served by interpreters, in name order.
    pub fn interpreter_extensions(&self) -> impl Iterator<Item = &str> {
        self.interpreters.keys().map(String::as_str)
    }

    /// Load a module file. `working_dir` is where command factories run.
    pub fn load(&self, path: &Path, working_dir: &Path) -> Result<ExportedValue, ModuleError> {
        let extension = extension_of(path);

        if let Some(command) = self.interpreters.get(&extension) {
            let factory = CommandFactory::new(command, path, working_dir).ok_or_else(|| {
                ModuleError::UnsupportedExtension { path: path.to_path_buf(), extension }
            })?;
            return Ok(ExportedValue::Factory(Arc::new(factory)));
        }

        if !DATA_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ModuleError::UnsupportedExtension { path: path.to_path_buf(), extension });
        }

        let text = fs::read_to_string(path)
            .map_err(|source| ModuleError::Read { path: path.to_path_buf(), source })?;
        let document = parse_document(path, &text)
            .map_err(|message| ModuleError::Parse { path: path.to_path_buf(), message })?;

        Ok(ExportedValue::from_document(document))
    }
}

/// A module evaluated by an external interpreter on every call.
///
/// The runtime data is written to stdin as JSON (`null` when absent); stdout
/// must hold the returned JSON value. Empty stdout means "returned nothing".
#[derive(Debug, Clone)]
pub struct CommandFactory {
    program: String,
    args: Vec<String>,
    module: PathBuf,
    working_dir: PathBuf,
}

impl CommandFactory {
    /// Build from an interpreter command line; `None` when the command is empty.
    pub fn new(command: &[String], module: &Path, working_dir: &Path) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            module: module.to_path_buf(),
            working_dir: working_dir.to_path_buf(),
        })
    }

    /// The module file passed to the interpreter.
    pub fn module(&self) -> &Path {
        &self.module
    }
}

impl Factory for CommandFactory {
    fn call(&self, data: Option<&RuntimeData>) -> Result<Value, MaterializeError> {
        let input = match data {
            Some(data) => serde_json::to_vec(data).map_err(MaterializeError::Serialization)?,
            None => b"null".to_vec(),
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.module)
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                MaterializeError::Invoke(format!("failed to start '{}': {}", self.program, e))
            })?;

        // Feed stdin from another thread so a chatty child cannot block on a full stdout pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || {
                // A child that exits without reading stdin closes the pipe; that is fine.
                let _ = stdin.write_all(&input);
            })
        });

        let output = child.wait_with_output().map_err(|e| {
            MaterializeError::Invoke(format!("failed to wait for '{}': {}", self.program, e))
        })?;

        if let Some(writer) = writer {
            let _ = writer.join();
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MaterializeError::Invoke(format!(
                "{} {} exited with {}: {}",
                self.program,
                self.module.display(),
                output.status,
                stderr.trim()
            )));
        }

        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&output.stdout).map_err(MaterializeError::Serialization)
    }
}

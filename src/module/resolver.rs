//! Module resolution with a per-resolver module cache.
//!
//! Requests are resolved against the build context root the same way a
//! `require` of a relative path is: join, normalize, then probe the exact
//! file, `<path>.<ext>` for each extension, and `<path>/index.<ext>`.
//!
//! The cache maps resolved paths to their export and is never invalidated.
//! A resolver therefore lives for exactly one build run; the pipeline
//! creates a fresh one for every run so edits are picked up on rebuilds.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::loader::ModuleLoader;
use super::{ExportedValue, Factory, ModuleError};

/// Resolves module requests to exported values.
pub struct ModuleResolver {
    /// Build context root
    context: PathBuf,
    /// Extensions probed in order
    extensions: Vec<String>,
    /// File loaders
    loader: ModuleLoader,
    /// Native factories by normalized absolute path
    natives: HashMap<PathBuf, Arc<dyn Factory>>,
    /// Loaded modules by resolved path
    cache: HashMap<PathBuf, Arc<ExportedValue>>,
}

impl ModuleResolver {
    /// Create a resolver for a context root with the default data extensions.
    pub fn new(context: impl Into<PathBuf>) -> Self {
        Self {
            context: context.into(),
            extensions: super::loader::DATA_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            loader: ModuleLoader::new(),
            natives: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    /// Set the probed extensions.
    ///
    /// Interpreter extensions of the loader are probed after these.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Set the file loader.
    pub fn with_loader(mut self, loader: ModuleLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Register a native factory under a path relative to the context root.
    pub fn register_factory(&mut self, request: &str, factory: Arc<dyn Factory>) {
        let key = self.absolute(request);
        self.natives.insert(key, factory);
    }

    /// The build context root.
    pub fn context(&self) -> &Path {
        &self.context
    }

    /// Number of modules loaded so far.
    pub fn cached_modules(&self) -> usize {
        self.cache.len()
    }

    /// Resolve a request to its export, loading it on first use.
    ///
    /// Repeated requests for the same module return the same `Arc`.
    pub fn resolve(&mut self, request: &str) -> Result<Arc<ExportedValue>, ModuleError> {
        let path = self.resolve_path(request)?;

        if let Some(cached) = self.cache.get(&path) {
            tracing::debug!(module = %path.display(), "module cache hit");
            return Ok(Arc::clone(cached));
        }

        let exported = match self.natives.get(&path) {
            Some(factory) => ExportedValue::Factory(Arc::clone(factory)),
            None => self.loader.load(&path, &self.context)?,
        };
        tracing::debug!(module = %path.display(), export = exported.kind(), "module loaded");

        let exported = Arc::new(exported);
        self.cache.insert(path, Arc::clone(&exported));
        Ok(exported)
    }

    /// Find the path a request refers to without loading it.
    pub fn resolve_path(&self, request: &str) -> Result<PathBuf, ModuleError> {
        let base = self.absolute(request);

        if self.natives.contains_key(&base) || base.is_file() {
            return Ok(base);
        }

        for ext in self.probe_extensions() {
            let candidate = with_appended_extension(&base, ext);
            if self.natives.contains_key(&candidate) || candidate.is_file() {
                return Ok(candidate);
            }
        }

        if base.is_dir() {
            for ext in self.probe_extensions() {
                let index = base.join(format!("index.{}", ext));
                if index.is_file() {
                    return Ok(index);
                }
            }
        }

        Err(ModuleError::NotFound { request: request.to_string(), context: self.context.clone() })
    }

    fn probe_extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.extensions.iter().map(String::as_str).collect();
        for ext in self.loader.interpreter_extensions() {
            if !exts.contains(&ext) {
                exts.push(ext);
            }
        }
        exts
    }

    fn absolute(&self, request: &str) -> PathBuf {
        normalize(&self.context.join(request))
    }
}

/// `task` + `json5` -> `task.json5`, keeping any existing dots in the name.
fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

/// Lexically fold `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::serde_factory;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_normalize_folds_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/b/./")), PathBuf::from("/a/b"));
    }

    #[test]
    fn test_resolve_exact_file() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "count/task.json5", "{version: '0.0.1'}");

        let resolver = ModuleResolver::new(temp.path());
        assert_eq!(resolver.resolve_path("./count/task.json5").unwrap(), path);
    }

    #[test]
    fn test_resolve_probes_extensions_in_order() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "echo/task.toml", "version = \"0.0.1\"");
        let json5 = write(temp.path(), "echo/task.json5", "{}");

        let resolver = ModuleResolver::new(temp.path());
        assert_eq!(resolver.resolve_path("./echo/task").unwrap(), json5);

        let resolver = ModuleResolver::new(temp.path())
            .with_extensions(vec!["toml".to_string(), "json5".to_string()]);
        assert_eq!(resolver.resolve_path("echo/task").unwrap(), temp.path().join("echo/task.toml"));
    }

    #[test]
    fn test_resolve_directory_index() {
        let temp = TempDir::new().unwrap();
        let index = write(temp.path(), "sleep/index.json", "{}");

        let resolver = ModuleResolver::new(temp.path());
        assert_eq!(resolver.resolve_path("./sleep").unwrap(), index);
    }

    #[test]
    fn test_resolve_probes_interpreter_extensions_last() {
        let temp = TempDir::new().unwrap();
        let script = write(temp.path(), "nodejs/task.js", "module.exports = () => ({})");

        let loader = ModuleLoader::new()
            .with_interpreters(BTreeMap::from([("js".to_string(), vec!["node".to_string()])]));
        let resolver = ModuleResolver::new(temp.path()).with_loader(loader);

        assert_eq!(resolver.resolve_path("./nodejs/task").unwrap(), script);
    }

    #[test]
    fn test_resolve_parent_relative_request() {
        let temp = TempDir::new().unwrap();
        let shared = write(temp.path(), "shared/base.json", "{}");

        let resolver = ModuleResolver::new(temp.path().join("jobs"));
        assert_eq!(resolver.resolve_path("../shared/base.json").unwrap(), shared);
    }

    #[test]
    fn test_resolve_not_found() {
        let temp = TempDir::new().unwrap();
        let mut resolver = ModuleResolver::new(temp.path());

        let err = resolver.resolve("./missing/task").unwrap_err();
        match err {
            ModuleError::NotFound { request, context } => {
                assert_eq!(request, "./missing/task");
                assert_eq!(context, temp.path());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_resolve_caches_by_resolved_path() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "log/task.json", r#"{"version": "0.0.1"}"#);
        let mut resolver = ModuleResolver::new(temp.path());

        let first = resolver.resolve("./log/task.json").unwrap();
        // Different spelling, same module
        let second = resolver.resolve("log/../log/task").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cached_modules(), 1);

        // The cache is not invalidated by edits
        fs::write(&path, r#"{"version": "9.9.9"}"#).unwrap();
        let third = resolver.resolve("./log/task.json").unwrap();
        match third.as_ref() {
            ExportedValue::Descriptor(map) => assert_eq!(map["version"], json!("0.0.1")),
            other => panic!("unexpected export {:?}", other),
        }
    }

    #[test]
    fn test_resolve_native_factory_without_file() {
        let temp = TempDir::new().unwrap();
        let mut resolver = ModuleResolver::new(temp.path());
        resolver.register_factory("./x/task.js", serde_factory(|_| json!({"version": "0.0.1"})));

        let exported = resolver.resolve("x/task.js").unwrap();
        assert!(exported.is_factory());
    }

    #[test]
    fn test_native_factory_shadows_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "x/task.json", "{}");
        let mut resolver = ModuleResolver::new(temp.path());
        resolver.register_factory("x/task.json", serde_factory(|_| 1));

        assert!(resolver.resolve("./x/task.json").unwrap().is_factory());
    }

    #[test]
    fn test_load_errors_are_not_cached() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "bad.json", "{");
        let mut resolver = ModuleResolver::new(temp.path());

        assert!(matches!(resolver.resolve("./bad.json"), Err(ModuleError::Parse { .. })));
        assert_eq!(resolver.cached_modules(), 0);

        fs::write(&path, "{}").unwrap();
        assert_eq!(resolver.resolve("./bad.json").unwrap().kind(), "descriptor");
    }
}

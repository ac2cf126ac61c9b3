use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bertrpc_term::Term;
use tracing::info;

use crate::error::{CallError, Result, RpcError};

/// An exposed function: positional arguments in, one term out.
pub type Function = Arc<dyn Fn(Vec<Term>) -> std::result::Result<Term, CallError> + Send + Sync>;

/// A named set of functions.
///
/// Only callables can be registered, so a lookup that finds an entry can
/// always invoke it.
#[derive(Clone, Default)]
pub struct Module {
    functions: HashMap<String, Function>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a function.
    pub fn function<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Term>) -> std::result::Result<Term, CallError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Function names, sorted.
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("functions", &self.function_names())
            .finish()
    }
}

/// Modules a server exposes, by name.
///
/// Populate it before serving; a running server shares it read-only
/// (`Arc<ModuleRegistry>`) across connections.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Module>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` under `name`, replacing any previous entry.
    pub fn expose(&mut self, name: impl Into<String>, module: Module) -> Option<Module> {
        let name = name.into();
        info!(module = %name, functions = ?module.function_names(), "module exposed");
        self.modules.insert(name, module)
    }

    /// Builder form of [`expose`](Self::expose).
    pub fn with_module(mut self, name: impl Into<String>, module: Module) -> Self {
        self.expose(name, module);
        self
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Resolve `module:function`.
    pub fn lookup(&self, module: &str, function: &str) -> Result<&Function> {
        let entry = self
            .modules
            .get(module)
            .ok_or_else(|| RpcError::NoSuchModule(module.to_string()))?;
        entry.get(function).ok_or_else(|| RpcError::NoSuchFunction {
            module: module.to_string(),
            function: function.to_string(),
        })
    }

    /// Module names, sorted.
    pub fn module_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::RwLock;

use crate::error::{BridgeError, Result};
use crate::value::HostValue;

/// Identifiers the host already owns. Shadowing these would break the page.
pub const RESERVED_NAMES: &[&str] = &[
    "globalThis",
    "window",
    "self",
    "document",
    "console",
    "Object",
    "Function",
    "Array",
    "String",
    "Number",
    "Boolean",
    "Symbol",
    "Promise",
    "Reflect",
    "Proxy",
    "JSON",
    "Math",
    "WebAssembly",
    "eval",
    "undefined",
    "NaN",
    "Infinity",
];

pub type Handler = dyn Fn(&[HostValue]) -> Result<HostValue> + Send + Sync;

/// A host-visible name bound to a local handler.
#[derive(Clone)]
pub struct Binding {
    name: String,
    handler: Arc<Handler>,
}

impl Binding {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&[HostValue]) -> Result<HostValue> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[HostValue]) -> Result<HostValue> {
        (self.handler)(args)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding").field("name", &self.name).finish()
    }
}

pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BridgeError::EmptyName);
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(BridgeError::ReservedName(name.to_string()));
    }
    Ok(())
}

/// Flat `name -> binding` mapping. Each instance is independent.
#[derive(Default)]
pub struct Registry {
    bindings: RwLock<HashMap<String, Binding>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `binding`, replacing (and returning) any binding of the same name.
    pub fn insert(&self, binding: Binding) -> Result<Option<Binding>> {
        validate_name(binding.name())?;
        let name = binding.name().to_string();
        let previous = self.bindings.write().insert(name.clone(), binding);
        if previous.is_some() {
            warn!("Binding `{name}` re-registered, previous handler replaced");
        } else {
            info!("Registered binding `{name}`");
        }
        Ok(previous)
    }

    pub fn register<F>(&self, name: &str, handler: F) -> Result<Option<Binding>>
    where
        F: Fn(&[HostValue]) -> Result<HostValue> + Send + Sync + 'static,
    {
        self.insert(Binding::new(name, handler))
    }

    pub fn get(&self, name: &str) -> Option<Binding> {
        self.bindings.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }

    /// Call the binding registered under `name`.
    ///
    /// The lock is released before the handler runs, so handlers may be
    /// invoked from several host contexts at once and may themselves touch
    /// the registry.
    pub fn invoke(&self, name: &str, args: &[HostValue]) -> Result<HostValue> {
        let binding = self
            .get(name)
            .ok_or_else(|| BridgeError::UnknownBinding(name.to_string()))?;
        binding.call(args)
    }

    pub fn unregister(&self, name: &str) -> Option<Binding> {
        let removed = self.bindings.write().remove(name);
        if removed.is_some() {
            debug!("Unregistered binding `{name}`");
        }
        removed
    }

    pub fn unregister_all(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.write().drain().map(|(name, _)| name).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: &'static str) -> impl Fn(&[HostValue]) -> Result<HostValue> + Send + Sync {
        move |_| Ok(HostValue::from(value))
    }

    #[test]
    fn test_register_and_invoke() {
        let registry = Registry::new();
        assert!(registry.register("greet", constant("hi")).unwrap().is_none());

        assert!(registry.contains("greet"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.invoke("greet", &[]).unwrap(), HostValue::from("hi"));
    }

    #[test]
    fn test_last_writer_wins() {
        let registry = Registry::new();
        registry.register("greet", constant("first")).unwrap();
        let replaced = registry.register("greet", constant("second")).unwrap();

        assert_eq!(replaced.map(|b| b.name().to_string()), Some("greet".to_string()));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.invoke("greet", &[]).unwrap(),
            HostValue::from("second")
        );
    }

    #[test]
    fn test_rejects_bad_names() {
        let registry = Registry::new();
        assert_eq!(
            registry.register("", constant("x")).unwrap_err(),
            BridgeError::EmptyName
        );
        assert_eq!(
            registry.register("console", constant("x")).unwrap_err(),
            BridgeError::ReservedName("console".to_string())
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_binding() {
        let registry = Registry::new();
        assert_eq!(
            registry.invoke("nope", &[]).unwrap_err(),
            BridgeError::UnknownBinding("nope".to_string())
        );
    }

    #[test]
    fn test_independent_instances() {
        let a = Registry::new();
        let b = Registry::new();
        a.register("only_in_a", constant("a")).unwrap();

        assert!(a.contains("only_in_a"));
        assert!(!b.contains("only_in_a"));
    }

    #[test]
    fn test_unregister() {
        let registry = Registry::new();
        registry.register("b", constant("b")).unwrap();
        registry.register("a", constant("a")).unwrap();
        registry.register("c", constant("c")).unwrap();

        assert_eq!(registry.names(), vec!["a", "b", "c"]);
        assert!(registry.unregister("b").is_some());
        assert!(registry.unregister("b").is_none());
        assert_eq!(registry.unregister_all(), vec!["a", "c"]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handler_may_reenter_registry() {
        let registry = Arc::new(Registry::new());
        registry.register("inner", constant("inner")).unwrap();
        let weak = Arc::downgrade(&registry);
        registry
            .register("outer", move |args| match weak.upgrade() {
                Some(registry) => registry.invoke("inner", args),
                None => Ok(HostValue::Undefined),
            })
            .unwrap();

        assert_eq!(
            registry.invoke("outer", &[]).unwrap(),
            HostValue::from("inner")
        );
    }
}

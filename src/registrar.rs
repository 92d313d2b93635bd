use std::sync::Arc;

use log::{info, warn};

use crate::error::Result;
use crate::registry::{Binding, Registry, validate_name};
use crate::value::HostValue;

/// The host's global namespace of callables.
pub trait HostNamespace {
    fn install(&mut self, binding: &Binding) -> Result<()>;
    fn remove(&mut self, name: &str) -> Result<()>;
}

/// For native hosts: bindings are only reachable through the registry.
#[derive(Debug, Default)]
pub struct LocalNamespace;

impl HostNamespace for LocalNamespace {
    fn install(&mut self, _binding: &Binding) -> Result<()> {
        Ok(())
    }

    fn remove(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }
}

/// Registers bindings into a [`Registry`] and mirrors them into the host namespace.
pub struct Registrar<N> {
    registry: Arc<Registry>,
    namespace: N,
}

impl<N: HostNamespace> Registrar<N> {
    pub fn new(registry: Arc<Registry>, namespace: N) -> Self {
        Self {
            registry,
            namespace,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn namespace(&self) -> &N {
        &self.namespace
    }

    pub fn register<F>(&mut self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(&[HostValue]) -> Result<HostValue> + Send + Sync + 'static,
    {
        // Validate before touching the host so a bad name leaves no trace anywhere.
        validate_name(name)?;
        let binding = Binding::new(name, handler);
        self.namespace.install(&binding)?;
        self.registry.insert(binding)?;
        Ok(())
    }

    /// Remove every binding from the host and the registry, returning the removed names.
    pub fn unregister_all(&mut self) -> Vec<String> {
        let names = self.registry.unregister_all();
        for name in &names {
            if let Err(e) = self.namespace.remove(name) {
                warn!("Failed to remove `{name}` from host namespace: {e}");
            }
        }
        info!("Unregistered {} binding(s)", names.len());
        names
    }
}

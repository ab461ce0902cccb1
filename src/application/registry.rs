//! Name-keyed factories for servers and components.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::domain::error::{LifecycleError, RegistryError};
use crate::domain::ports::{Component, Server};
use crate::infrastructure::config::ConfigStore;

/// Builds a server from the resolved configuration.
pub type ServerFactory =
    Box<dyn Fn(&ConfigStore) -> anyhow::Result<Arc<dyn Server>> + Send + Sync>;

/// Builds a component from the resolved configuration.
pub type ComponentFactory =
    Box<dyn Fn(&ConfigStore) -> anyhow::Result<Arc<dyn Component>> + Send + Sync>;

/// Two independent registries of factories, one for servers and one for
/// components. Names are unique within each registry.
///
/// Factories are invoked in name order.
#[derive(Default)]
pub struct Registry {
    servers: BTreeMap<String, ServerFactory>,
    components: BTreeMap<String, ComponentFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a server factory under `name`.
    ///
    /// # Errors
    /// [`RegistryError::DuplicateServer`] if the name is already taken.
    pub fn register_server<F>(
        &mut self,
        name: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&ConfigStore) -> anyhow::Result<Arc<dyn Server>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.servers.contains_key(&name) {
            return Err(RegistryError::DuplicateServer(name));
        }
        debug!(server = %name, "Registered server factory");
        self.servers.insert(name, Box::new(factory));
        Ok(())
    }

    /// Register a component factory under `name`.
    ///
    /// # Errors
    /// [`RegistryError::DuplicateComponent`] if the name is already taken.
    pub fn register_component<F>(
        &mut self,
        name: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&ConfigStore) -> anyhow::Result<Arc<dyn Component>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.components.contains_key(&name) {
            return Err(RegistryError::DuplicateComponent(name));
        }
        debug!(component = %name, "Registered component factory");
        self.components.insert(name, Box::new(factory));
        Ok(())
    }

    pub fn server_names(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Construct every server whose name is not in `disabled`.
    ///
    /// Stops at the first factory error; servers built so far are dropped
    /// without ever being started.
    pub fn build_servers(
        &self,
        store: &ConfigStore,
        disabled: &BTreeSet<String>,
    ) -> Result<Vec<(String, Arc<dyn Server>)>, LifecycleError> {
        if let Some(unknown) = disabled.iter().find(|n| !self.servers.contains_key(*n)) {
            return Err(RegistryError::UnknownServer(unknown.clone()).into());
        }

        self.servers
            .iter()
            .filter(|(name, _)| !disabled.contains(*name))
            .map(|(name, factory)| {
                debug!(server = %name, "Creating server");
                factory(store)
                    .map(|server| (name.clone(), server))
                    .map_err(|source| LifecycleError::Factory {
                        name: name.clone(),
                        source,
                    })
            })
            .collect()
    }

    /// Construct every registered component.
    pub fn build_components(
        &self,
        store: &ConfigStore,
    ) -> Result<Vec<(String, Arc<dyn Component>)>, LifecycleError> {
        self.components
            .iter()
            .map(|(name, factory)| {
                factory(store)
                    .map(|component| (name.clone(), component))
                    .map_err(|source| LifecycleError::ComponentFactory {
                        name: name.clone(),
                        source,
                    })
            })
            .collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("servers", &self.servers.keys().collect::<Vec<_>>())
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

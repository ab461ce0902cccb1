use thiserror::Error;

/// Errors raised while registering factories.
///
/// Both duplicate variants are startup-fatal: the process must not continue
/// with an ambiguous factory binding.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Component {0} already registered")]
    DuplicateComponent(String),

    #[error("Server {0} already registered")]
    DuplicateServer(String),

    #[error("Server not registered: {0}")]
    UnknownServer(String),

    #[error("Component not registered: {0}")]
    UnknownComponent(String),
}

impl RegistryError {
    /// Name of the server or component concerned.
    pub fn name(&self) -> &str {
        match self {
            Self::DuplicateComponent(name)
            | Self::DuplicateServer(name)
            | Self::UnknownServer(name)
            | Self::UnknownComponent(name) => name,
        }
    }
}

/// Errors raised by the lifecycle orchestrator.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Application setup failed: {0:#}")]
    Setup(#[source] anyhow::Error),

    #[error("Unable to create \"{name}\" server: {source:#}")]
    Factory {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unable to create \"{name}\" component: {source:#}")]
    ComponentFactory {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Server \"{name}\" failed: {source:#}")]
    ServerFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl LifecycleError {
    /// Name of the server or component the error is about, if any.
    pub fn unit_name(&self) -> Option<&str> {
        match self {
            Self::Factory { name, .. }
            | Self::ComponentFactory { name, .. }
            | Self::ServerFailed { name, .. } => Some(name),
            Self::Registry(e) => Some(e.name()),
            Self::Setup(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_unit() {
        let err = LifecycleError::Factory {
            name: "grpc".to_string(),
            source: anyhow::anyhow!("port missing"),
        };
        assert_eq!(err.to_string(), "Unable to create \"grpc\" server: port missing");
        assert_eq!(err.unit_name(), Some("grpc"));

        let err = LifecycleError::from(RegistryError::DuplicateServer("http".to_string()));
        assert_eq!(err.to_string(), "Server http already registered");
        assert_eq!(err.unit_name(), Some("http"));
    }
}

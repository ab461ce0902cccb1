pub mod config;
pub mod config_node;
pub mod duration;
pub mod placeholder;
pub mod server_state;
pub mod string_list;

pub use config::{
    LifecycleConfig, RemoteConfigSettings, StartFailurePolicy, LIFECYCLE_CONFIG_KEY,
    REMOTE_CONFIG_KEY,
};
pub use config_node::ConfigNode;
pub use placeholder::Placeholder;
pub use server_state::ServerState;

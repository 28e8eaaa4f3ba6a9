pub mod provider;
pub mod settings;

pub use provider::{ConfigProvider, EnvConfig, StaticConfig};
pub use settings::{AppConfig, ScyllaConfig, ServerConfig, Settings};

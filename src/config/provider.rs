use std::collections::HashMap;
use std::env;

/// Read access to process-wide configuration.
///
/// Values are looked up on every call; implementations must not cache
/// `get` results across requests.
pub trait ConfigProvider: Send + Sync {
    /// Returns the value for `key`, if set.
    fn get(&self, key: &str) -> Option<String>;

    /// Name of the environment the application is running in.
    fn current_environment(&self) -> String;
}

/// Reads keys from the live process environment.
///
/// The environment name is resolved once at startup, so it is held here
/// rather than re-read.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    environment: String,
}

impl EnvConfig {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
        }
    }
}

impl ConfigProvider for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn current_environment(&self) -> String {
        self.environment.clone()
    }
}

/// Fixed key/value configuration, for wiring without touching the
/// process environment.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    values: HashMap<String, String>,
    environment: String,
}

impl StaticConfig {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            values: HashMap::new(),
            environment: environment.into(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigProvider for StaticConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn current_environment(&self) -> String {
        self.environment.clone()
    }
}

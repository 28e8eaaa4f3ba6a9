use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub scylla: ScyllaConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct ScyllaConfig {
    pub nodes: Vec<String>,
    pub keyspace: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Runtime environment name, e.g. `production`, `testing`, `local`.
    pub environment: String,
    pub session_idle_timeout_secs: u64,
    pub max_sessions: usize,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, String> {
        Ok(Settings {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|e| format!("Invalid SERVER_PORT: {}", e))?,
            },
            scylla: ScyllaConfig {
                nodes: env::var("SCYLLA_NODES")
                    .unwrap_or_else(|_| "localhost:9042".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                keyspace: env::var("SCYLLA_KEYSPACE")
                    .unwrap_or_else(|_| "testing_autologin".to_string()),
                username: env::var("SCYLLA_USERNAME").ok(),
                password: env::var("SCYLLA_PASSWORD").ok(),
            },
            app: AppConfig {
                environment: env::var("APP_ENV")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "production".to_string()),
                session_idle_timeout_secs: env::var("SESSION_IDLE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "1800".to_string())
                    .parse()
                    .unwrap_or(1800),
                max_sessions: env::var("SESSION_MAX")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()
                    .unwrap_or(10000),
            },
        })
    }
}

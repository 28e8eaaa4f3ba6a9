pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod middleware;
pub mod repositories;
pub mod services;
pub mod sessions;

pub use config::Settings;
pub use db::DbClient;
pub use middleware::TestingAutoAuthenticator;

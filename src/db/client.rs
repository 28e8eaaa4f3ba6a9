use scylla::{Session, SessionBuilder};
use std::sync::Arc;
use thiserror::Error;

use crate::config::ScyllaConfig;

use super::migration;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] scylla::transport::errors::NewSessionError),

    #[error("Query error: {0}")]
    QueryError(#[from] scylla::transport::errors::QueryError),

    #[error("Not found")]
    NotFound,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Migration error: {0}")]
    MigrationError(String),
}

#[derive(Clone)]
pub struct DbClient {
    session: Arc<Session>,
}

impl DbClient {
    pub async fn new(config: &ScyllaConfig) -> Result<Self, DbError> {
        tracing::info!("Opening Scylla session against {:?}", config.nodes);
        let mut builder = SessionBuilder::new().known_nodes(&config.nodes);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            tracing::debug!("Authenticating to Scylla as '{}'", username);
            builder = builder.user(username, password);
        }
        let session = builder.build().await?;

        migration::run_migrations(&session, config).await?;

        session.use_keyspace(&config.keyspace, false).await?;
        tracing::info!("Using keyspace '{}'", config.keyspace);

        Ok(DbClient {
            session: Arc::new(session),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

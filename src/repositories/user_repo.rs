use async_trait::async_trait;
use scylla::IntoTypedRows;
use scylla::query::Query;

use crate::db::{DbClient, DbError, UserRow};
use crate::domain::User;

/// Outcome of looking a user up by id.
#[derive(Debug)]
pub enum UserLookup {
    Found(User),
    NotFound,
    Error(DbError),
}

impl From<Result<User, DbError>> for UserLookup {
    fn from(result: Result<User, DbError>) -> Self {
        match result {
            Ok(user) => UserLookup::Found(user),
            Err(DbError::NotFound) => UserLookup::NotFound,
            Err(e) => UserLookup::Error(e),
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, user_id: &str) -> UserLookup;

    async fn insert_user(&self, user: &User) -> Result<(), DbError>;
}

#[derive(Clone)]
pub struct UserRepository {
    client: DbClient,
}

impl UserRepository {
    pub fn new(client: DbClient) -> Self {
        Self { client }
    }

    /// Get a user by id
    pub async fn get_user(&self, user_id: &str) -> Result<User, DbError> {
        let query = Query::new(crate::db::queries::SELECT_USER);

        let result = self.client.session().query(query, (user_id,)).await?;

        let row = result
            .rows
            .ok_or(DbError::NotFound)?
            .into_typed::<UserRow>()
            .next()
            .ok_or(DbError::NotFound)?
            .map_err(|e| DbError::InvalidData(format!("Failed to parse user row: {}", e)))?;

        Ok(row.to_user())
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_id(&self, user_id: &str) -> UserLookup {
        self.get_user(user_id).await.into()
    }

    async fn insert_user(&self, user: &User) -> Result<(), DbError> {
        let row = UserRow::from_user(user);
        let query = Query::new(crate::db::queries::INSERT_USER);

        self.client
            .session()
            .query(query, (row.user_id, row.name, row.email, row.created_at))
            .await?;

        Ok(())
    }
}

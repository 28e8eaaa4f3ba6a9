use std::sync::Arc;

use crate::db::DbError;
use crate::domain::User;
use crate::repositories::{UserLookup, UserStore};

pub struct UserService {
    users: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Create a user with the given id
    pub async fn create_user(
        &self,
        user_id: String,
        name: String,
        email: String,
    ) -> Result<User, DbError> {
        let user_id = user_id.trim().to_string();
        if user_id.is_empty() {
            return Err(DbError::InvalidData("user_id must not be empty".to_string()));
        }
        if !email.contains('@') {
            return Err(DbError::InvalidData(format!("Invalid email: {}", email)));
        }

        let user = User::new(user_id, name, email);
        self.users.insert_user(&user).await?;

        Ok(user)
    }

    /// Get a user by id
    pub async fn get_user(&self, user_id: &str) -> Result<User, DbError> {
        match self.users.find_by_id(user_id).await {
            UserLookup::Found(user) => Ok(user),
            UserLookup::NotFound => Err(DbError::NotFound),
            UserLookup::Error(e) => Err(e),
        }
    }
}

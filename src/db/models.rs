use chrono::{DateTime, Utc};
use scylla::FromRow;

use crate::domain::User;

// Database row model for users table
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn from_user(user: &User) -> Self {
        UserRow {
            user_id: user.user_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }

    pub fn to_user(self) -> User {
        User {
            user_id: self.user_id,
            name: self.name,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

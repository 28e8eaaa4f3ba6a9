use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(user_id: String, name: String, email: String) -> Self {
        Self {
            user_id,
            name,
            email,
            created_at: Utc::now(),
        }
    }
}

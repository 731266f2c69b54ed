use sqlx::FromRow;

use crate::auth::claims::Principal;

/// Row of the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String, // argon2 PHC string
    pub role: String,
}

impl UserRecord {
    /// `None` for ids that do not fit the token's unsigned id.
    pub fn principal(&self) -> Option<Principal> {
        Some(Principal {
            id: u64::try_from(self.id).ok()?,
            username: self.username.clone(),
            role: self.role.clone(),
        })
    }
}

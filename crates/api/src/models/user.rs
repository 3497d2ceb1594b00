//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use catalog_core::{Email, Role, UserId};

/// A catalog account (domain type).
///
/// The password hash is never part of this type; it is only read by the
/// login path through `UserRepository::get_credentials`.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Unique email address.
    pub email: Email,
    /// Account role.
    pub role: Role,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

use serde::{Deserialize, Serialize};

/// User record as persisted in the users file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: u64,                   // assigned by the store
    pub first_name: String,
    pub last_name: String,
    pub email: String,             // normalized, unique
    pub password: String,          // plaintext, never leaves the store
    pub registration_date: String, // UTC, millisecond precision
}

/// Validated registration, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

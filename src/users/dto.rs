use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::users::{repo_types::UserRecord, validation::ValidationErrors};

/// Registration form as submitted. Any field may be absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Public part of a freshly registered user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<UserRecord> for PublicUser {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListItem {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub registration_date: String,
}

impl From<UserRecord> for UserListItem {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            registration_date: u.registration_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub count: usize,
    pub users: Vec<UserListItem>,
}

/// Error half of every user endpoint.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Failure body; carries either a message or per-field errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
}

impl ErrorResponse {
    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(msg.into()),
            errors: None,
        }
    }

    pub fn fields(errors: ValidationErrors) -> Self {
        Self {
            success: false,
            message: None,
            errors: Some(errors),
        }
    }
}

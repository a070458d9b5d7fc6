use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    state::AppState,
    users::{
        dto::{ApiError, ErrorResponse, PublicUser, RegisterResponse, UserListResponse},
        extractors::Submission,
        repo::StoreError,
        validation::validate,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/users", get(list_users))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Submission(payload): Submission,
) -> Result<Json<RegisterResponse>, ApiError> {
    let new_user = match validate(&payload) {
        Ok(u) => u,
        Err(errors) => {
            let failed: Vec<_> = errors.iter().map(|e| (e.field, e.kind)).collect();
            warn!(?failed, "registration rejected by validation");
            return Err((StatusCode::BAD_REQUEST, Json(ErrorResponse::fields(errors))));
        }
    };

    let user = match state.users.add(new_user).await {
        Ok(u) => u,
        Err(StoreError::DuplicateEmail) => {
            warn!("email already registered");
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::message("User with this email already exists")),
            ));
        }
        Err(e) => {
            error!(error = %e, "registration failed");
            return Err(internal("Internal server error"));
        }
    };

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(Json(RegisterResponse {
        success: true,
        message: "Registration successful!",
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UserListResponse>, ApiError> {
    let users = state.users.list().await.map_err(|e| {
        error!(error = %e, "list users failed");
        internal("Error reading user data")
    })?;

    Ok(Json(UserListResponse {
        success: true,
        count: users.len(),
        users: users.into_iter().map(Into::into).collect(),
    }))
}

fn internal(msg: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::message(msg)),
    )
}

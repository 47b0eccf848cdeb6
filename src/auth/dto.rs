use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::Role;

/// Request body for sign-in.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Returned after a successful sign-in.
#[derive(Debug, Serialize)]
pub struct SignInResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub token: String,
}

/// Request body for a credential update. A missing or empty `newPassword`
/// leaves the stored hash untouched.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub email: String,
    pub current_password: String,
    #[serde(default)]
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

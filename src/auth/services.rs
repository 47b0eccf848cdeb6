//! Account operations. Each one is a straight pipeline over the store and the
//! token keys that stops at the first failing stage.

use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{SignInResponse, UpdateRequest},
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_against_dummy},
        repo::UserStore,
        repo_types::User,
    },
    config::normalize_email,
    error::{AppError, AppResult},
};

const BAD_SIGN_IN: AppError = AppError::InvalidCredentials("Invalid email or password");

/// Unknown email and wrong password produce the same error.
pub async fn sign_in(
    store: &dyn UserStore,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> AppResult<SignInResponse> {
    let email = normalize_email(email);

    let Some(user) = store.find_by_email(&email).await? else {
        verify_against_dummy(password.to_owned()).await;
        warn!(email = %email, "sign-in unknown email");
        return Err(BAD_SIGN_IN);
    };

    if !store.verify_secret(&user, password).await? {
        warn!(user_id = %user.id, "sign-in invalid password");
        return Err(BAD_SIGN_IN);
    }

    let token = keys.sign(user.id, user.role).context("sign session token")?;

    info!(user_id = %user.id, role = %user.role, "user signed in");
    Ok(SignInResponse {
        id: user.id,
        email: user.email,
        role: user.role,
        token,
    })
}

/// Replaces the password hash when a non-empty new password is given.
/// Without one the call still succeeds and nothing is written.
pub async fn update_credentials(store: &dyn UserStore, req: UpdateRequest) -> AppResult<()> {
    let email = normalize_email(&req.email);

    let mut user = store
        .find_by_email(&email)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;

    if !store.verify_secret(&user, &req.current_password).await? {
        warn!(user_id = %user.id, "update with invalid current password");
        return Err(AppError::InvalidCredentials("Invalid current password"));
    }

    let Some(new_password) = req.new_password.filter(|p| !p.is_empty()) else {
        info!(user_id = %user.id, "update without new password; nothing to change");
        return Ok(());
    };

    user.password_hash = hash_password_blocking(new_password).await?;
    store.save(&user).await?;

    info!(user_id = %user.id, "password updated");
    Ok(())
}

/// Loads the record behind a verified token. The account may have vanished
/// since the token was issued.
pub async fn get_profile(store: &dyn UserStore, user_id: Uuid) -> AppResult<User> {
    store
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("User not found"))
}

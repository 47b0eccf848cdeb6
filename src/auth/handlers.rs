use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{MessageResponse, SignInRequest, SignInResponse, UpdateRequest},
        extractors::{AuthUser, JsonBody},
        repo_types::User,
        services,
    },
    error::AppResult,
    state::AppState,
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/signin", post(sign_in))
        .route("/update", put(update))
        .route("/profile", get(profile))
}

#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SignInRequest>,
) -> AppResult<Json<SignInResponse>> {
    let res = services::sign_in(
        state.users.as_ref(),
        &state.keys,
        &payload.email,
        &payload.password,
    )
    .await?;
    Ok(Json(res))
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UpdateRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::update_credentials(state.users.as_ref(), payload).await?;
    Ok(Json(MessageResponse {
        message: "User updated successfully".into(),
    }))
}

#[instrument(skip(state, claims), fields(user_id = %claims.sub))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> AppResult<Json<User>> {
    let user = services::get_profile(state.users.as_ref(), claims.sub).await?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use time::{Duration, OffsetDateTime};
    use tower::ServiceExt;

    use crate::{
        app::build_app,
        auth::{repo::memory::MemoryUserStore, repo_types::Role},
        seed::seed_default_accounts,
        state::AppState,
    };

    async fn seeded_app() -> (Router, AppState, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::default());
        let state = AppState::fake(store.clone());
        seed_default_accounts(store.as_ref(), &state.config.seed_accounts).await;
        (build_app(state.clone()), state, store)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn profile_request(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri("/profile");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn sign_in(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
        send(
            app,
            json_request("POST", "/signin", json!({ "email": email, "password": password })),
        )
        .await
    }

    #[tokio::test]
    async fn seeded_admin_can_sign_in() {
        let (app, state, _) = seeded_app().await;

        let (status, body) = sign_in(&app, "admin@gamage.com", "1234").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "admin@gamage.com");
        assert_eq!(body["role"], "Admin");
        assert!(body["_id"].is_string());

        let claims = state.keys.verify(body["token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.sub.to_string(), body["_id"].as_str().unwrap());
        assert_eq!(claims.role, Role::Admin);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let (app, _, _) = seeded_app().await;

        let (status, wrong) = sign_in(&app, "admin@gamage.com", "wrong").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong["message"], "Invalid email or password");

        let (status, unknown) = sign_in(&app, "nobody@gamage.com", "1234").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown, wrong);
    }

    #[tokio::test]
    async fn store_outage_is_a_generic_500() {
        let (app, _, store) = seeded_app().await;
        store.break_connection();

        let (status, body) = sign_in(&app, "admin@gamage.com", "1234").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "message": "Server error" }));
    }

    #[tokio::test]
    async fn update_flow() {
        let (app, _, _) = seeded_app().await;

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                "/update",
                json!({ "email": "manager@gamage.com", "currentPassword": "1234", "newPassword": "n3w" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User updated successfully");

        assert_eq!(sign_in(&app, "manager@gamage.com", "1234").await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(sign_in(&app, "manager@gamage.com", "n3w").await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn update_without_new_password_still_succeeds() {
        let (app, _, _) = seeded_app().await;

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                "/update",
                json!({ "email": "cbl@gmail.com", "currentPassword": "1234" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User updated successfully");
        assert_eq!(sign_in(&app, "cbl@gmail.com", "1234").await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn update_failures() {
        let (app, _, _) = seeded_app().await;

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                "/update",
                json!({ "email": "ghost@gamage.com", "currentPassword": "1234", "newPassword": "x" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                "/update",
                json!({ "email": "cbl@gmail.com", "currentPassword": "nope", "newPassword": "x" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid current password");
    }

    #[tokio::test]
    async fn profile_with_valid_token_hides_secret() {
        let (app, _, _) = seeded_app().await;
        let (_, signed_in) = sign_in(&app, "manager2@gamage.com", "1234").await;
        let token = signed_in["token"].as_str().unwrap();

        let (status, body) = send(&app, profile_request(Some(&format!("Bearer {token}")))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["_id"], signed_in["_id"]);
        assert_eq!(body["username"], "Manager 02");
        assert_eq!(body["mobileNumber"], "0000000002");
        assert_eq!(body["role"], "Manager");

        let fields = body.as_object().unwrap();
        assert!(fields
            .keys()
            .all(|k| !k.to_lowercase().contains("password") && !k.to_lowercase().contains("hash")));
    }

    #[tokio::test]
    async fn profile_without_token() {
        let (app, _, _) = seeded_app().await;

        let (status, body) = send(&app, profile_request(None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "No token, authorization denied");

        let (status, _) = send(&app, profile_request(Some("Basic YWRtaW46MTIzNA=="))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn profile_rejects_tampered_and_expired_tokens() {
        let (app, state, _) = seeded_app().await;
        let (_, signed_in) = sign_in(&app, "admin@gamage.com", "1234").await;
        let token = signed_in["token"].as_str().unwrap().to_string();

        let mut tampered = token.into_bytes();
        let last = tampered.len() - 3;
        tampered[last] = if tampered[last] == b'x' { b'y' } else { b'x' };
        let tampered = String::from_utf8(tampered).unwrap();
        let (status, body) = send(&app, profile_request(Some(&format!("Bearer {tampered}")))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token");

        let id = signed_in["_id"].as_str().unwrap().parse().unwrap();
        let issued = OffsetDateTime::now_utc() - Duration::minutes(61);
        let expired = state.keys.sign_at(id, Role::Admin, issued).unwrap();
        let (status, body) = send(&app, profile_request(Some(&format!("Bearer {expired}")))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token");
    }

    #[tokio::test]
    async fn profile_for_deleted_account_is_404() {
        let (app, _, store) = seeded_app().await;
        let (_, signed_in) = sign_in(&app, "cbl@gmail.com", "1234").await;
        let token = signed_in["token"].as_str().unwrap();
        store.remove(signed_in["_id"].as_str().unwrap().parse().unwrap());

        let (status, body) = send(&app, profile_request(Some(&format!("Bearer {token}")))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");
    }
    #[tokio::test]
    async fn malformed_bodies_get_short_json_messages() {
        let (app, _, _) = seeded_app().await;

        let (status, body) = send(
            &app,
            json_request("POST", "/signin", json!({ "email": "admin@gamage.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "Missing or invalid fields" }));

        let (status, body) = send(
            &app,
            json_request("PUT", "/update", json!({ "email": "cbl@gmail.com", "newPassword": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "Missing or invalid fields" }));

        let broken = Request::builder()
            .method("POST")
            .uri("/signin")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"email\": "))
            .unwrap();
        let (status, body) = send(&app, broken).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "Malformed JSON body" }));

        let plain = Request::builder()
            .method("POST")
            .uri("/signin")
            .body(Body::from("email=admin@gamage.com&password=1234"))
            .unwrap();
        let (status, body) = send(&app, plain).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "Expected a JSON body" }));
    }
}

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    AppState,
    auth::verify_token,
    error::ApiError,
    models::ClassEvent,
    validation::{parse_time, parse_weekday, validate_name},
};

#[derive(Debug, serde::Deserialize, ToSchema)]
pub struct RegisterClassRequest {
    pub group_id: String,
    pub name: String,
    /// Weekday label, e.g. "mon" or "monday".
    pub weekday: String,
    /// Wall-clock class start, "HH:MM".
    pub time: String,
    #[serde(default)]
    pub description: String,
    /// Channel the reminder will be posted to.
    pub channel_id: u64,
}

#[derive(Debug, serde::Serialize, ToSchema)]
pub struct RegisteredClass {
    pub key: String,
    pub event: ClassEvent,
}

#[derive(Debug, serde::Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct GroupQuery {
    pub group_id: String,
    pub token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct RemoveQuery {
    pub group_id: String,
    /// Case-insensitive substring matched against class names.
    pub name: String,
    pub token: Option<String>,
}

#[utoipa::path(get, path = "/", tag = "classes")]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Class Reminder API",
        "endpoints": {
            "GET /classes": "List registered classes for a group",
            "POST /classes": "Register a class",
            "DELETE /classes": "Remove classes by name substring"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "classes")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(get, path = "/healthz/ready", tag = "classes")]
pub async fn healthz_ready() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(
    post,
    path = "/classes",
    request_body = RegisterClassRequest,
    params(
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 201, description = "Class registered (or overwritten under the same key)", body = RegisteredClass),
        (status = 400, description = "Invalid weekday, time, or empty name"),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "classes"
)]
pub async fn register_class(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    axum::extract::Query(query): axum::extract::Query<TokenQuery>,
    Json(request): Json<RegisterClassRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    verify_token(&state.settings, auth_header, query.token.as_deref())?;

    // No event is stored unless every field validates.
    let name = validate_name(&request.name)?;
    let day = parse_weekday(&request.weekday)?;
    let time = parse_time(&request.time)?;

    let event = ClassEvent {
        name: name.to_string(),
        day,
        time,
        description: request.description.trim().to_string(),
        channel_id: request.channel_id,
    };
    let key = state.store.upsert(&request.group_id, event.clone()).await?;
    info!(group_id = %request.group_id, key = %key, "class registered");

    Ok((StatusCode::CREATED, Json(RegisteredClass { key, event })))
}

#[utoipa::path(
    get,
    path = "/classes",
    params(
        ("group_id" = String, Query, description = "Group to list classes for"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Registered classes ordered by weekday and time", body = [ClassEvent]),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "classes"
)]
pub async fn list_classes(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    axum::extract::Query(query): axum::extract::Query<GroupQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    verify_token(&state.settings, auth_header, query.token.as_deref())?;

    let events = state.store.list(&query.group_id).await;
    Ok(Json(events))
}

#[utoipa::path(
    delete,
    path = "/classes",
    params(
        ("group_id" = String, Query, description = "Group to remove classes from"),
        ("name" = String, Query, description = "Case-insensitive substring matched against class names"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Removed classes; empty when nothing matched", body = [ClassEvent]),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "classes"
)]
pub async fn remove_classes(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    axum::extract::Query(query): axum::extract::Query<RemoveQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    verify_token(&state.settings, auth_header, query.token.as_deref())?;

    let removed = state.store.remove_by_name(&query.group_id, &query.name).await?;
    info!(
        group_id = %query.group_id,
        query = %query.name,
        removed = removed.len(),
        "classes removed"
    );
    Ok(Json(removed))
}

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use campus_live::Hub;
use campus_shared::{
    Announcement, AnnouncementDraft, Message, MessageDraft, PresenceStatus, Role, SystemStats,
    User,
};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/users", get(list_users).post(add_user))
        .route("/users/{id}", get(get_user).delete(kick_user))
        .route("/users/{id}/status", put(set_status))
        .route("/users/{id}/role", put(set_role))
        .route("/users/{id}/channel", put(set_channel))
        .route("/channels", get(list_channels))
        .route(
            "/channels/{channel_id}/messages",
            get(list_messages).post(send_message),
        )
        .route(
            "/channels/{channel_id}/messages/{message_id}",
            patch(edit_message),
        )
        .route(
            "/channels/{channel_id}/messages/{message_id}/reactions",
            post(toggle_reaction),
        )
        .route(
            "/channels/{channel_id}/typing",
            get(typing_users).post(set_typing),
        )
        .route(
            "/announcements",
            get(list_announcements).post(add_announcement),
        )
        .route("/stats", get(get_stats).put(put_stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    typing_ttl_secs: u64,
    stats_interval_secs: u64,
    online_users: usize,
}

#[derive(Deserialize)]
struct StatusRequest {
    status: String,
}

#[derive(Deserialize)]
struct RoleRequest {
    role: String,
}

#[derive(Deserialize)]
struct ChannelRequest {
    #[serde(default)]
    channel: Option<String>,
}

#[derive(Deserialize)]
struct AnnouncementQuery {
    #[serde(default)]
    role: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KickResponse {
    user_id: String,
    removed: bool,
}

#[derive(Deserialize)]
struct EditRequest {
    content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReactionRequest {
    emoji: String,
    user_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypingRequest {
    user_id: String,
    is_typing: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TypingResponse {
    channel_id: String,
    typing: Vec<String>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        typing_ttl_secs: state.config.typing_ttl.as_secs(),
        stats_interval_secs: state.config.stats_interval.as_secs(),
        online_users: state.hub.online_count(),
    })
}

// ─── Presence ───

async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.hub.get_users())
}

async fn add_user(
    State(state): State<AppState>,
    Json(user): Json<User>,
) -> Result<(StatusCode, Json<User>)> {
    let stored = state.hub.add_user(user)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<User>> {
    state
        .hub
        .get_user(&id)
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("user {id}")))
}

/// Removal is idempotent: kicking an unknown user still succeeds.
async fn kick_user(State(state): State<AppState>, Path(id): Path<String>) -> Json<KickResponse> {
    let removed = state.hub.remove_user(&id).is_some();
    info!(user = %id, removed, "User kicked");
    Json(KickResponse {
        user_id: id,
        removed,
    })
}

async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<User>> {
    let status: PresenceStatus = req.status.parse()?;
    state
        .hub
        .update_user_status(&id, status)
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("user {id}")))
}

async fn set_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RoleRequest>,
) -> Result<Json<User>> {
    let role: Role = req.role.parse()?;
    let user = state
        .hub
        .set_user_role(&id, role)
        .ok_or_else(|| ServerError::NotFound(format!("user {id}")))?;
    info!(user = %id, role = %role, "User role changed");
    Ok(Json(user))
}

async fn set_channel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChannelRequest>,
) -> Result<Json<User>> {
    let channel = req.channel.filter(|c| !c.trim().is_empty());
    state
        .hub
        .set_current_channel(&id, channel)
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("user {id}")))
}

// ─── Messages ───

async fn list_channels(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.hub.channels())
}

async fn list_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Json<Vec<Message>> {
    Json(state.hub.get_messages(&channel_id))
}

/// Sending a message also clears the sender's typing indicator.
async fn send_message(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(draft): Json<MessageDraft>,
) -> Result<(StatusCode, Json<Message>)> {
    let message = state.hub.add_message(&channel_id, draft)?;
    if state
        .hub
        .typing_map(&channel_id)
        .contains_key(&message.user_id)
    {
        state.hub.set_typing(&channel_id, &message.user_id, false)?;
    }
    Ok((StatusCode::CREATED, Json(message)))
}

async fn edit_message(
    State(state): State<AppState>,
    Path((channel_id, message_id)): Path<(String, String)>,
    Json(req): Json<EditRequest>,
) -> Result<Json<Message>> {
    state
        .hub
        .edit_message(&channel_id, &message_id, req.content)?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("message {message_id}")))
}

async fn toggle_reaction(
    State(state): State<AppState>,
    Path((channel_id, message_id)): Path<(String, String)>,
    Json(req): Json<ReactionRequest>,
) -> Result<Json<Message>> {
    state
        .hub
        .toggle_reaction(&channel_id, &message_id, &req.emoji, &req.user_id)?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("message {message_id}")))
}

// ─── Typing ───

async fn typing_users(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Json<TypingResponse> {
    let typing = state.hub.typing_users(&channel_id);
    Json(TypingResponse { channel_id, typing })
}

async fn set_typing(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(req): Json<TypingRequest>,
) -> Result<Json<TypingResponse>> {
    state
        .hub
        .set_typing(&channel_id, &req.user_id, req.is_typing)?;
    let typing = state.hub.typing_users(&channel_id);
    Ok(Json(TypingResponse { channel_id, typing }))
}

// ─── Announcements & stats ───

/// `?role=student` keeps only the announcements addressed to that role.
async fn list_announcements(
    State(state): State<AppState>,
    Query(query): Query<AnnouncementQuery>,
) -> Result<Json<Vec<Announcement>>> {
    let mut announcements = state.hub.get_announcements();
    if let Some(role) = query.role {
        let role: Role = role.parse()?;
        announcements.retain(|a| a.audience.includes(role));
    }
    Ok(Json(announcements))
}

async fn add_announcement(
    State(state): State<AppState>,
    Json(draft): Json<AnnouncementDraft>,
) -> Result<(StatusCode, Json<Announcement>)> {
    let announcement = state.hub.add_announcement(draft)?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

async fn get_stats(State(state): State<AppState>) -> Json<SystemStats> {
    Json(state.hub.get_system_stats())
}

async fn put_stats(
    State(state): State<AppState>,
    Json(stats): Json<SystemStats>,
) -> Json<SystemStats> {
    Json(state.hub.update_system_stats(stats))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

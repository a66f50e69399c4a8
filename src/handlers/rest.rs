/// REST API handlers for HTTP endpoints.
/// Handles user registration, group creation, message exchange, and
/// mailbox retrieval.

use crate::addressing;
use crate::db::{models::*, Database, DbPool};
use crate::error::ApiError;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Register a new user
/// POST /users
pub async fn register_user(
    pool: web::Data<DbPool>,
    req: web::Json<RegisterUserRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    // Friendly pre-check; the unique constraint below remains the
    // authoritative guard against the check-then-act race.
    if Database::find_user(&pool, &req.username).await?.is_some() {
        return Err(ApiError::Conflict(
            "user with the same username already registered".to_string(),
        ));
    }

    let user = Database::create_user(&pool, &req.username)
        .await
        .map_err(|e| {
            ApiError::conflict_on_unique(e, "user with the same username already registered")
        })?;

    Ok(HttpResponse::Created().json(UserResponse {
        id: user.id,
        username: user.username,
    }))
}

/// Create a group with a fixed member list
/// POST /groups
pub async fn create_group(
    pool: web::Data<DbPool>,
    req: web::Json<CreateGroupRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let members = Database::find_users(&pool, &req.usernames).await?;
    if members.len() != req.usernames.len() {
        return Err(ApiError::invalid(
            "one or more group member usernames do not exist",
        ));
    }

    if Database::group_exists(&pool, &req.groupname).await? {
        return Err(ApiError::Conflict(
            "group with the same groupname already registered".to_string(),
        ));
    }

    let group = Database::create_group(&pool, &req.groupname, &members)
        .await
        .map_err(|e| {
            ApiError::conflict_on_unique(e, "group with the same groupname already registered")
        })?;

    Ok(HttpResponse::Created().json(GroupResponse {
        id: group.id,
        groupname: group.groupname,
        members: members.into_iter().map(|u| u.username).collect(),
    }))
}

/// Compose a new message to a user or a group
/// POST /messages
pub async fn compose_message(
    pool: web::Data<DbPool>,
    req: web::Json<ComposeMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    let draft = addressing::resolve_compose(&pool, &req).await?;
    let message = Database::create_message(&pool, &draft).await?;

    Ok(HttpResponse::Created().json(MessageResponse::from(&message)))
}

/// Fetch a single message
/// GET /messages/:id
pub async fn get_message(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let message = Database::get_message(&pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("message with given id does not exist"))?;

    Ok(HttpResponse::Ok().json(MessageResponse::from(&message)))
}

/// Reply to an existing message; the reply inherits the origin's
/// addressing target
/// POST /messages/:id/replies
pub async fn post_reply(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    req: web::Json<ReplyMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    let origin_id = path.into_inner();

    let draft = addressing::resolve_reply(&pool, &req, origin_id).await?;
    let message = Database::create_message(&pool, &draft).await?;

    Ok(HttpResponse::Created().json(MessageResponse::from(&message)))
}

/// List replies to a message, most recent first
/// GET /messages/:id/replies
pub async fn list_replies(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    if Database::get_message(&pool, id).await?.is_none() {
        return Err(ApiError::not_found("message with given id does not exist"));
    }

    let replies = Database::get_replies(&pool, id).await?;
    let body: Vec<MessageResponse> = replies.iter().map(MessageResponse::from).collect();

    Ok(HttpResponse::Ok().json(body))
}

/// Retrieve a user's mailbox: direct messages plus messages to groups the
/// user belongs to, most recent first
/// GET /users/:username/mailbox
pub async fn get_mailbox(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let username = path.into_inner();

    let user = Database::find_user(&pool, &username)
        .await?
        .ok_or_else(|| ApiError::not_found("user with given username does not exist"))?;

    let messages = Database::mailbox(&pool, user.id).await?;
    let body: Vec<MessageResponse> = messages.iter().map(MessageResponse::from).collect();

    Ok(HttpResponse::Ok().json(body))
}

/// Health check endpoint; verifies the storage layer is reachable
/// GET /health
pub async fn health(pool: web::Data<DbPool>) -> HttpResponse {
    match Database::ping(&pool).await {
        Ok(true) => HttpResponse::Ok().json(json!({ "status": "ok" })),
        Ok(false) => HttpResponse::ServiceUnavailable().json(json!({
            "error": "database schema missing"
        })),
        Err(e) => {
            log::error!("Health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(json!({
                "error": "database unavailable"
            }))
        }
    }
}

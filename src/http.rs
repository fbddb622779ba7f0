// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! HTTP surface.
//!
//! | Route | Method | Body | Response |
//! |---|---|---|---|
//! | `/api/chat/messages` | GET | | newest records, oldest first |
//! | `/api/chat/messages` | POST | `{"text": "..."}` | the stored record |
//! | `/api/confession/messages` | GET / POST | same | same |
//!
//! Errors are `{"error": "..."}`: 400 for rejected text or a malformed body,
//! 500 when the store fails.
//!
//! Any origin may call the API, and responses are gzip-compressed when the
//! client accepts it.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::coordinator::Board;
use crate::record::{Record, StreamKind};
use crate::storage::traits::StorageError;

#[derive(Debug, Deserialize)]
pub struct PostMessage {
    pub text: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn save(stream: StreamKind, error: StorageError) -> Self {
        match error {
            StorageError::Validation(reason) => Self {
                status: StatusCode::BAD_REQUEST,
                message: reason.to_string(),
            },
            _ => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: match stream {
                    StreamKind::Chat => "Failed to save message",
                    StreamKind::Confession => "Failed to save confession",
                }
                .to_string(),
            },
        }
    }

    fn body(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }

    fn fetch(stream: StreamKind) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: match stream {
                StreamKind::Chat => "Failed to fetch messages",
                StreamKind::Confession => "Failed to fetch confessions",
            }
            .to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

pub fn router(board: Arc<Board>) -> Router {
    Router::new()
        .route("/api/chat/messages", get(list_chat).post(post_chat))
        .route("/api/confession/messages", get(list_confession).post(post_confession))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(board)
}

async fn list(board: &Board, stream: StreamKind) -> Result<Json<Vec<Record>>, ApiError> {
    board
        .latest(stream)
        .await
        .map(Json)
        .map_err(|_| ApiError::fetch(stream))
}

async fn post(
    board: &Board,
    stream: StreamKind,
    body: Result<Json<PostMessage>, JsonRejection>,
) -> Result<Json<Record>, ApiError> {
    let Json(body) = body.map_err(ApiError::body)?;
    board
        .post(stream, &body.text)
        .await
        .map(Json)
        .map_err(|e| ApiError::save(stream, e))
}

async fn list_chat(State(board): State<Arc<Board>>) -> Result<Json<Vec<Record>>, ApiError> {
    list(&board, StreamKind::Chat).await
}

async fn post_chat(
    State(board): State<Arc<Board>>,
    body: Result<Json<PostMessage>, JsonRejection>,
) -> Result<Json<Record>, ApiError> {
    post(&board, StreamKind::Chat, body).await
}

async fn list_confession(State(board): State<Arc<Board>>) -> Result<Json<Vec<Record>>, ApiError> {
    list(&board, StreamKind::Confession).await
}

async fn post_confession(
    State(board): State<Arc<Board>>,
    body: Result<Json<PostMessage>, JsonRejection>,
) -> Result<Json<Record>, ApiError> {
    post(&board, StreamKind::Confession, body).await
}

use crate::controller::{ApiResponse, Participants};
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use log::*;

/// PUT a user into a chat's participant set.
#[utoipa::path(
    put,
    path = "/chats/{chat_id}/participants/{user_id}",
    params(
        ("chat_id" = String, Path, description = "Chat to join"),
        ("user_id" = String, Path, description = "User joining the chat"),
    ),
    responses(
        (status = 204, description = "User is a participant of the chat"),
    )
)]
pub async fn add(
    State(app_state): State<AppState>,
    Path((chat_id, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, Error> {
    debug!("PUT participant {user_id} into chat {chat_id}");

    app_state
        .membership
        .add_participant(&chat_id, &user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE a user from a chat's participant set.
#[utoipa::path(
    delete,
    path = "/chats/{chat_id}/participants/{user_id}",
    params(
        ("chat_id" = String, Path, description = "Chat to leave"),
        ("user_id" = String, Path, description = "User leaving the chat"),
    ),
    responses(
        (status = 204, description = "User is no longer a participant of the chat"),
        (status = 404, description = "Chat not found"),
    )
)]
pub async fn delete(
    State(app_state): State<AppState>,
    Path((chat_id, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, Error> {
    debug!("DELETE participant {user_id} from chat {chat_id}");

    app_state
        .membership
        .remove_participant(&chat_id, &user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET the participants of a chat.
#[utoipa::path(
    get,
    path = "/chats/{chat_id}/participants",
    params(
        ("chat_id" = String, Path, description = "Chat whose participants to list"),
    ),
    responses(
        (status = 200, description = "Participants of the chat", body = Participants),
        (status = 404, description = "Chat not found"),
    )
)]
pub async fn index(
    State(app_state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let participants = app_state.membership.get_participants(&chat_id).await?;

    let mut user_ids: Vec<String> = participants.into_iter().collect();
    user_ids.sort();

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        Participants { chat_id, user_ids },
    )))
}

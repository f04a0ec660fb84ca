use crate::controller::{Accepted, ApiResponse};
use crate::{AppState, Error};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use messages::Draft;

use log::*;

/// POST a new chat message to the messages log.
///
/// A 202 means the record was appended, not that anyone received it.
#[utoipa::path(
    post,
    path = "/messages",
    request_body = messages::Draft,
    responses(
        (status = 202, description = "Message appended to the log", body = Accepted),
        (status = 422, description = "chat_id, sender_id or text is empty"),
        (status = 500, description = "The log rejected the append"),
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(draft): Json<Draft>,
) -> Result<impl IntoResponse, Error> {
    draft.validate()?;

    let message = draft.into_message();
    debug!(
        "POST message {} to chat {} from {}",
        message.message_id, message.chat_id, message.sender_id
    );

    let offset = app_state.log_appender.append_message(&message)?;
    debug!(
        "Message {} appended to topic {} at offset {}",
        message.message_id,
        app_state.log_appender.topic(),
        offset
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::new(
            StatusCode::ACCEPTED.into(),
            Accepted {
                message_id: message.message_id,
                offset,
            },
        )),
    ))
}

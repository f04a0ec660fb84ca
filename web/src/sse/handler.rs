use crate::params::subscribe::SubscribeParams;
use crate::sse::transport::SseTransport;
use crate::{AppState, Error};
use async_stream::stream;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use fanout::Error as FanOutError;
use futures::Stream;
use log::*;
use std::convert::Infallible;

/// GET a live stream of every message delivered to a user.
///
/// One session per HTTP stream; a newer subscription for the same user
/// replaces this one and ends its stream.
#[utoipa::path(
    get,
    path = "/subscribe",
    params(SubscribeParams),
    responses(
        (status = 200, description = "Stream of `message` events, one per delivered message",
            content_type = "text/event-stream", body = messages::Message),
        (status = 400, description = "Missing or empty user_id"),
    )
)]
pub(crate) async fn subscribe(
    State(app_state): State<AppState>,
    Query(params): Query<SubscribeParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, Error> {
    let user_id = params.user_id;
    if user_id.is_empty() {
        return Err(FanOutError::Input("user ID required".to_string()).into());
    }

    debug!("Establishing SSE subscription for user {user_id}");

    let (transport, mut events, cancel) = SseTransport::new(&app_state.shutdown);
    let subscriptions = app_state.subscriptions.clone();
    let session_user = user_id.clone();

    tokio::spawn(async move {
        match subscriptions.subscribe(&session_user, transport).await {
            Ok(()) => debug!("Subscription for user {session_user} ended"),
            Err(e) => info!("Subscription for user {session_user} terminated: {e}"),
        }
    });

    // Dropping the response body cancels the session.
    let guard = cancel.drop_guard();

    let stream = stream! {
        let _guard = guard;

        while let Some(event) = events.recv().await {
            yield Ok(event);
        }

        debug!("SSE stream for user {user_id} closed");
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

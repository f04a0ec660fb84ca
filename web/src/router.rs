use crate::controller::{
    health_check_controller, message_controller, participant_controller, Accepted, Participants,
};
use crate::{sse, AppState};
use axum::{
    routing::{get, post, put},
    Router,
};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI document. To be a part
// of the rendered document, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Chat Fan-out API"
        ),
        paths(
            health_check_controller::health_check,
            message_controller::create,
            participant_controller::add,
            participant_controller::delete,
            participant_controller::index,
            sse::handler::subscribe,
        ),
        components(
            schemas(
                messages::Message,
                messages::Draft,
                Accepted,
                Participants,
            )
        ),
        tags(
            (name = "chat_fanout", description = "Real-time chat message fan-out")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(message_routes(app_state.clone()))
        .merge(participant_routes(app_state.clone()))
        .merge(subscribe_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn message_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/messages", post(message_controller::create))
        .with_state(app_state)
}

fn participant_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/chats/:chat_id/participants",
            get(participant_controller::index),
        )
        .route(
            "/chats/:chat_id/participants/:user_id",
            put(participant_controller::add).delete(participant_controller::delete),
        )
        .with_state(app_state)
}

fn subscribe_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/subscribe", get(sse::handler::subscribe))
        .with_state(app_state)
}

use serde::Serialize;
use utoipa::ToSchema;

pub(crate) mod health_check_controller;
pub(crate) mod message_controller;
pub(crate) mod participant_controller;

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status_code: u16, data: T) -> Self {
        Self {
            status_code,
            data: Some(data),
        }
    }
}

/// Acknowledgement of a message durably appended to the log.
#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct Accepted {
    pub(crate) message_id: String,
    /// Log offset assigned to the record
    pub(crate) offset: u64,
}

/// Current participant set of a chat.
#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct Participants {
    pub(crate) chat_id: String,
    /// Sorted user ids
    pub(crate) user_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_serialize_accepted_response() {
        let response = ApiResponse::new(
            StatusCode::ACCEPTED.into(),
            Accepted {
                message_id: "m1".to_string(),
                offset: 7,
            },
        );

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({"status_code": 202, "data": {"message_id": "m1", "offset": 7}})
        );
    }

    #[test]
    fn test_serialize_response_without_data() {
        let response = ApiResponse::<()> {
            status_code: StatusCode::NO_CONTENT.into(),
            data: None,
        };

        let serialized = serde_json::to_string(&response).unwrap();
        assert_eq!(serialized, json!({"status_code": 204}).to_string());
    }
}

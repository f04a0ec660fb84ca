use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct SubscribeParams {
    /// Identity of the subscribing user, as validated upstream
    #[serde(default)]
    pub(crate) user_id: String,
}

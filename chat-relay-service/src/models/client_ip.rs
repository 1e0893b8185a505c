use serde::{Deserialize, Serialize};

/// Body of `GET /api/ip`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIpResponse {
    pub ip: String,

    /// Only present on the development placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ClientIpResponse {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            note: None,
        }
    }
}

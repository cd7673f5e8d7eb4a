use serde::{Deserialize, Serialize};

/// Wrapper every catalog API response is delivered in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: T,
}

/// Envelope shape of a rejected request. `data` may be absent or null, so
/// only the message is kept.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendBook;

    #[test]
    fn envelope_wraps_list_payload() {
        let json = r#"{"success":true,"message":"Books retrieved","data":[]}"#;
        let envelope: ApiEnvelope<Vec<BackendBook>> =
            serde_json::from_str(json).expect("envelope");
        assert!(envelope.success);
        assert_eq!(envelope.message, "Books retrieved");
        assert!(envelope.data.is_empty());
    }

    #[test]
    fn error_envelope_tolerates_extra_fields() {
        let json = r#"{"success":false,"message":"Validation failed","error":{"name":"ValidationError"}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(json).expect("error envelope");
        assert!(!envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("Validation failed"));
    }
}

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Opens an upload session for one destination file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadRequest {
    /// Destination directory.
    pub path: String,
    pub filename: String,
    pub total_chunks: u64,
}

/// Asks the server to assemble the uploaded chunks into the destination file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeUploadRequest {
    pub upload_id: String,
    pub path: String,
    pub filename: String,
}

/// Discards a session and any chunks stored for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelUploadRequest {
    pub upload_id: String,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Result of opening a session. `upload_id` is present when `success` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of assembling a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeUploadResponse {
    pub success: bool,
    /// Final path of the assembled file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of discarding a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelUploadResponse {
    #[serde(default)]
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_request_field_names() {
        let req = InitUploadRequest {
            path: "/docs".into(),
            filename: "report.pdf".into(),
            total_chunks: 3,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["path"], "/docs");
        assert_eq!(v["filename"], "report.pdf");
        assert_eq!(v["totalChunks"], 3);
    }

    #[test]
    fn finalize_request_field_names() {
        let req = FinalizeUploadRequest {
            upload_id: "u-1".into(),
            path: "/docs/sub".into(),
            filename: "a.txt".into(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"uploadId\":\"u-1\""));
        assert!(!json.contains("upload_id"));
    }

    #[test]
    fn cancel_request_field_names() {
        let req = CancelUploadRequest {
            upload_id: "u-9".into(),
        };
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"uploadId":"u-9"}"#);
    }

    #[test]
    fn init_response_success() {
        let json = r#"{"success":true,"uploadId":"abc123"}"#;
        let resp: InitUploadResponse = serde_json::from_str(json).unwrap();
        assert!(resp.success);
        assert_eq!(resp.upload_id.as_deref(), Some("abc123"));
        assert!(resp.error.is_none());
    }

    #[test]
    fn init_response_failure_without_id() {
        let json = r#"{"success":false,"error":"disk full"}"#;
        let resp: InitUploadResponse = serde_json::from_str(json).unwrap();
        assert!(!resp.success);
        assert!(resp.upload_id.is_none());
        assert_eq!(resp.error.as_deref(), Some("disk full"));
    }

    #[test]
    fn finalize_response_optional_fields() {
        let resp: FinalizeUploadResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(resp.success);
        assert!(resp.path.is_none());

        let resp: FinalizeUploadResponse =
            serde_json::from_str(r#"{"success":true,"path":"/docs/a.txt"}"#).unwrap();
        assert_eq!(resp.path.as_deref(), Some("/docs/a.txt"));
    }

    #[test]
    fn cancel_response_tolerates_empty_object() {
        let resp: CancelUploadResponse = serde_json::from_str("{}").unwrap();
        assert!(!resp.success);
    }
}

//! Worker reply format.
//!
//! A worker answers each work item with either
//! `{"success": true, "result": {...}}` or `{"success": false, "error": "..."}`.

use serde::{Deserialize, Serialize};

use crate::models::ChunkAnalysis;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ChunkAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerResponse {
    pub fn success(result: ChunkAnalysis) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// The analysis on success, the error message otherwise
    pub fn into_result(self) -> Result<ChunkAnalysis, String> {
        match (self.success, self.result, self.error) {
            (true, Some(result), _) => Ok(result),
            (true, None, _) => Err("worker reported success without a result".to_string()),
            (false, _, Some(error)) => Err(error),
            (false, _, None) => Err("worker reported failure without an error".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let ok = WorkerResponse::success(ChunkAnalysis {
            purpose: "auth".to_string(),
            ..ChunkAnalysis::default()
        });
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["result"]["purpose"], json!("auth"));
        assert!(value.get("error").is_none());

        let failed = serde_json::to_value(WorkerResponse::failure("boom")).unwrap();
        assert_eq!(failed, json!({"success": false, "error": "boom"}));
    }

    #[test]
    fn test_malformed_responses_are_errors() {
        let response: WorkerResponse = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(response.into_result().is_err());

        let response: WorkerResponse = serde_json::from_value(json!({"success": false})).unwrap();
        assert_eq!(
            response.into_result().unwrap_err(),
            "worker reported failure without an error"
        );
    }
}

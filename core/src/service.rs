use crate::payload::ScanRow;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const RUN_ATTACK_PATH: &str = "run-attack";
pub const PREDICT_FROM_SCAN_PATH: &str = "predict-from-scan-json";
pub const HEALTH_PATH: &str = "health";

pub trait ClassificationService {
    fn run_attack(&self, request: &RunAttackRequest) -> Result<Value, ServiceError>;

    fn predict_from_scan_json(&self, rows: &[ScanRow]) -> Result<Value, ServiceError>;

    fn health(&self) -> Result<Value, ServiceError>;
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{endpoint} responded with {status}")]
    Status { endpoint: &'static str, status: u16 },
    #[error("{endpoint} request failed: {reason}")]
    Transport {
        endpoint: &'static str,
        reason: String,
    },
    #[error("{endpoint} returned an unreadable body: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },
    #[error("failed to encode {endpoint} request: {reason}")]
    Encode {
        endpoint: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunAttackRequest {
    pub attack: String,
    #[serde(rename = "requestCount")]
    pub request_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunAttackResponse {
    #[serde(default)]
    pub payload: Vec<Value>,
    #[serde(default)]
    pub results: Vec<MlResultEntry>,
    #[serde(default)]
    pub average_confidence: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub results: Vec<MlResultEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MlResultEntry {
    #[serde(default)]
    pub ml: Option<MlPrediction>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MlPrediction {
    #[serde(default)]
    pub is_port_probe: Option<bool>,
    #[serde(default)]
    pub is_dos: Option<bool>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl MlResultEntry {
    pub fn label(&self) -> Option<bool> {
        self.ml.as_ref().and_then(MlPrediction::label)
    }

    pub fn confidence(&self) -> Option<f64> {
        self.ml.as_ref().and_then(|ml| ml.confidence)
    }
}

impl MlPrediction {
    pub fn label(&self) -> Option<bool> {
        self.is_port_probe.or(self.is_dos)
    }
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

pub fn decode<T: DeserializeOwned>(endpoint: &'static str, body: &Value) -> Result<T, ServiceError> {
    serde_json::from_value(body.clone()).map_err(|err| ServiceError::Decode {
        endpoint,
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_attack_request_uses_wire_names() {
        let request = RunAttackRequest {
            attack: "Port Probing".to_string(),
            request_count: 100,
            max_age_seconds: Some(300),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"attack": "Port Probing", "requestCount": 100, "max_age_seconds": 300})
        );

        let without_age = RunAttackRequest {
            max_age_seconds: None,
            ..request
        };
        assert!(serde_json::to_value(&without_age)
            .unwrap()
            .get("max_age_seconds")
            .is_none());
    }

    #[test]
    fn decodes_sparse_run_attack_response() {
        let body = json!({
            "source": "simulation",
            "target": "https://example.test/output-json",
            "count": 2,
            "payload": [{"msg": "malicious traffic"}, {"msg": "malicious traffic"}],
            "results": [
                {"input": {}, "ml": {"is_dos": true, "confidence": 0.9}},
                {"input": {}, "error": "ML service request failed"}
            ],
            "average_confidence": 0.9,
            "note": "DoS simulation completed."
        });
        let response: RunAttackResponse = decode(RUN_ATTACK_PATH, &body).unwrap();
        assert_eq!(response.payload.len(), 2);
        assert_eq!(response.results[0].label(), Some(true));
        assert_eq!(response.results[1].label(), None);
        assert_eq!(response.results[1].error.as_deref(), Some("ML service request failed"));
        assert_eq!(response.average_confidence, Some(0.9));
        assert_eq!(response.source.as_deref(), Some("simulation"));
    }

    #[test]
    fn non_array_payload_is_a_decode_error() {
        let err = decode::<RunAttackResponse>(RUN_ATTACK_PATH, &json!({"payload": "nope"}))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Decode { endpoint: RUN_ATTACK_PATH, .. }));
    }

    #[test]
    fn status_error_names_endpoint() {
        let err = ServiceError::Status {
            endpoint: PREDICT_FROM_SCAN_PATH,
            status: 503,
        };
        assert_eq!(err.to_string(), "predict-from-scan-json responded with 503");
    }
}

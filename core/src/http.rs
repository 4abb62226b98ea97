use crate::config::ServiceConfig;
use crate::payload::ScanRow;
use crate::service::{
    ClassificationService, RunAttackRequest, ServiceError, HEALTH_PATH, PREDICT_FROM_SCAN_PATH,
    RUN_ATTACK_PATH,
};
use serde::Serialize;
use serde_json::Value;

/// Blocking HTTP client for the classification service.
pub struct HttpService {
    config: ServiceConfig,
    agent: ureq::Agent,
}

impl HttpService {
    pub fn new(config: ServiceConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self { config, agent }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &'static str,
        body: &B,
    ) -> Result<Value, ServiceError> {
        let url = self.config.endpoint(endpoint);
        let payload = serde_json::to_string(body).map_err(|err| ServiceError::Encode {
            endpoint,
            reason: err.to_string(),
        })?;
        log::debug!("POST {url} ({} bytes)", payload.len());

        let response = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&payload);
        read_json(endpoint, response)
    }

    fn get(&self, endpoint: &'static str) -> Result<Value, ServiceError> {
        let url = self.config.endpoint(endpoint);
        log::debug!("GET {url}");
        read_json(endpoint, self.agent.get(&url).call())
    }
}

impl ClassificationService for HttpService {
    fn run_attack(&self, request: &RunAttackRequest) -> Result<Value, ServiceError> {
        self.post(RUN_ATTACK_PATH, request)
    }

    fn predict_from_scan_json(&self, rows: &[ScanRow]) -> Result<Value, ServiceError> {
        self.post(PREDICT_FROM_SCAN_PATH, rows)
    }

    fn health(&self) -> Result<Value, ServiceError> {
        self.get(HEALTH_PATH)
    }
}

fn read_json(
    endpoint: &'static str,
    response: Result<ureq::Response, ureq::Error>,
) -> Result<Value, ServiceError> {
    match response {
        Ok(resp) => {
            let body = resp.into_string().map_err(|err| ServiceError::Transport {
                endpoint,
                reason: err.to_string(),
            })?;
            serde_json::from_str(&body).map_err(|err| ServiceError::Decode {
                endpoint,
                reason: err.to_string(),
            })
        }
        Err(ureq::Error::Status(status, _)) => Err(ServiceError::Status { endpoint, status }),
        Err(err) => Err(ServiceError::Transport {
            endpoint,
            reason: err.to_string(),
        }),
    }
}

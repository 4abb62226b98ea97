pub mod attack;
pub mod config;
pub mod http;
pub mod payload;
pub mod report;
pub mod runtime;
pub mod service;
pub mod verdict;

pub use attack::{
    AttackKind, AttackParseError, AttackProfile, ClassificationMode, DEFAULT_REQUEST_COUNT,
    REQUEST_COUNT_OPTIONS,
};
pub use config::ServiceConfig;
pub use http::HttpService;
pub use payload::{fallback_rows, parse_rows, PayloadError, ScanRow};
pub use report::{format_confidence, render_details, render_results_table, DetailOptions};
pub use runtime::{Orchestrator, PayloadSource, RunError, ScenarioResult, Session, SimulationRun};
pub use service::{
    ClassificationService, HealthStatus, MlPrediction, MlResultEntry, PredictResponse,
    RunAttackRequest, RunAttackResponse, ServiceError,
};
pub use verdict::{Verdict, DETECTION_THRESHOLD};

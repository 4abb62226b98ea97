use crate::attack::{AttackKind, AttackProfile, ClassificationMode};
use crate::payload::{rows_from_values, select_row, PayloadError, ScanRow};
use crate::report::render_results_table;
use crate::service::{
    decode, ClassificationService, MlResultEntry, PredictResponse, RunAttackRequest,
    RunAttackResponse, ServiceError, PREDICT_FROM_SCAN_PATH, RUN_ATTACK_PATH,
};
use crate::verdict::{mean_confidence, Verdict};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug)]
pub struct Orchestrator<S> {
    service: S,
    max_age_seconds: Option<u64>,
    fallback_overrides: HashMap<AttackKind, Vec<ScanRow>>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RunError {
    #[error(
        "Not yet implemented: {0} has no backend simulation (supported: {})",
        supported_names()
    )]
    Unsupported(AttackKind),
    #[error("No payload rows available to send for {0}")]
    NoPayload(AttackKind),
}

#[derive(Debug, thiserror::Error)]
enum AcquireError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Rows(#[from] PayloadError),
    #[error("run-attack returned no payload rows")]
    EmptyPayload,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PayloadSource {
    Remote,
    Fallback,
}

struct PayloadBatch {
    source: PayloadSource,
    rows: Vec<ScanRow>,
    remote: Option<RemoteRun>,
}

struct RemoteRun {
    body: Value,
    response: RunAttackResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub request_id: usize,
    pub payload: Value,
    pub response: Option<Value>,
    pub verdict: bool,
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScenarioResult {
    pub fn classified(
        request_id: usize,
        payload: Value,
        response: Value,
        verdict: Verdict,
        message: Option<String>,
    ) -> Self {
        Self {
            request_id,
            payload,
            response: Some(response),
            verdict: verdict.detected,
            confidence: verdict.confidence,
            message,
            error: None,
        }
    }

    pub fn failed(request_id: usize, payload: Value, error: String) -> Self {
        Self {
            request_id,
            payload,
            response: None,
            verdict: false,
            confidence: None,
            message: None,
            error: Some(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRun {
    pub attack: AttackKind,
    pub mode: ClassificationMode,
    pub requested: usize,
    pub source: PayloadSource,
    pub note: Option<String>,
    pub target: Option<String>,
    pub started_at: String,
    pub duration_ms: u128,
    pub results: Vec<ScenarioResult>,
}

impl SimulationRun {
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(ScenarioResult::is_failure)
    }

    pub fn detected_count(&self) -> usize {
        self.results.iter().filter(|result| result.verdict).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|result| result.is_failure()).count()
    }
}

impl fmt::Display for SimulationRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            ClassificationMode::PerRow => "per request",
            ClassificationMode::Aggregate => "aggregate",
        };
        let source = match self.source {
            PayloadSource::Remote => "service",
            PayloadSource::Fallback => "bundled fallback",
        };
        writeln!(f, "Attack: {} ({mode})", self.attack)?;
        writeln!(
            f,
            "Requested: {} | payload: {source} | started: {} | took {} ms",
            self.requested, self.started_at, self.duration_ms
        )?;
        if let Some(target) = &self.target {
            writeln!(f, "Target: {target}")?;
        }
        if let Some(note) = &self.note {
            writeln!(f, "Note: {note}")?;
        }

        let count = self.results.len();
        let plural = if count == 1 { "" } else { "s" };
        writeln!(f, "\nML Decisions ({count} request{plural})")?;
        writeln!(f, "{}", render_results_table(&self.results))?;
        write!(
            f,
            "Attack detected in {}/{count}; {} failed",
            self.detected_count(),
            self.failed_count()
        )
    }
}

impl<S: ClassificationService> Orchestrator<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            max_age_seconds: None,
            fallback_overrides: HashMap::new(),
        }
    }

    pub fn with_max_age(mut self, max_age_seconds: Option<u64>) -> Self {
        self.max_age_seconds = max_age_seconds;
        self
    }

    pub fn with_fallback_rows(mut self, attack: AttackKind, rows: Vec<ScanRow>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.with_default_banner(attack))
            .collect();
        self.fallback_overrides.insert(attack, rows);
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn run(&self, attack: AttackKind, request_count: usize) -> Result<SimulationRun, RunError> {
        let profile = attack.profile().ok_or(RunError::Unsupported(attack))?;
        self.run_profile(&profile, request_count)
    }

    fn run_profile(
        &self,
        profile: &AttackProfile,
        request_count: usize,
    ) -> Result<SimulationRun, RunError> {
        let request_count = request_count.max(1);
        let started_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());
        let timer = Instant::now();
        log::info!(
            "starting {} run with {request_count} request(s)",
            profile.kind
        );

        let batch = self.acquire_payload(profile, request_count)?;
        let results = match profile.mode {
            ClassificationMode::PerRow => self.classify_rows(&batch.rows, request_count),
            ClassificationMode::Aggregate => vec![aggregate_result(&batch)],
        };

        let (note, target) = match &batch.remote {
            Some(remote) => (remote.response.note.clone(), remote.response.target.clone()),
            None => (None, None),
        };
        let run = SimulationRun {
            attack: profile.kind,
            mode: profile.mode,
            requested: request_count,
            source: batch.source,
            note,
            target,
            started_at,
            duration_ms: timer.elapsed().as_millis(),
            results,
        };
        log::info!(
            "{} run finished: {} result(s), {} detected, {} failed",
            run.attack,
            run.results.len(),
            run.detected_count(),
            run.failed_count()
        );
        Ok(run)
    }

    fn acquire_payload(
        &self,
        profile: &AttackProfile,
        request_count: usize,
    ) -> Result<PayloadBatch, RunError> {
        match self.fetch_remote(profile, request_count) {
            Ok(batch) => return Ok(batch),
            Err(err) => {
                log::warn!("run-attack failed, falling back to local payload: {err}");
            }
        }

        let rows = match self.fallback_overrides.get(&profile.kind) {
            Some(rows) => rows.clone(),
            None => profile.fallback_rows(),
        };
        if rows.is_empty() {
            return Err(RunError::NoPayload(profile.kind));
        }
        Ok(PayloadBatch {
            source: PayloadSource::Fallback,
            rows,
            remote: None,
        })
    }

    fn fetch_remote(
        &self,
        profile: &AttackProfile,
        request_count: usize,
    ) -> Result<PayloadBatch, AcquireError> {
        let request = RunAttackRequest {
            attack: profile.kind.run_name().to_string(),
            request_count,
            max_age_seconds: self.max_age_seconds,
        };
        let body = self.service.run_attack(&request)?;
        let response: RunAttackResponse = decode(RUN_ATTACK_PATH, &body)?;
        if response.payload.is_empty() {
            return Err(AcquireError::EmptyPayload);
        }

        // Aggregate kinds ship opaque traffic samples rather than scan rows.
        let rows = match profile.mode {
            ClassificationMode::PerRow => rows_from_values(&response.payload)?,
            ClassificationMode::Aggregate => Vec::new(),
        };
        if let Some(note) = &response.note {
            log::info!("run-attack note: {note}");
        }

        Ok(PayloadBatch {
            source: PayloadSource::Remote,
            rows,
            remote: Some(RemoteRun { body, response }),
        })
    }

    fn classify_rows(&self, rows: &[ScanRow], request_count: usize) -> Vec<ScenarioResult> {
        let mut results = Vec::with_capacity(request_count);
        for index in 0..request_count {
            let Some(row) = select_row(rows, index) else {
                break;
            };
            let request_id = index + 1;
            let sent = std::slice::from_ref(row);
            let payload = json!(sent);
            log::debug!(
                "request #{request_id}: {}:{} ({})",
                row.target,
                row.port,
                row.state
            );

            let result = match self.classify_row(sent) {
                Ok((response, entry)) => {
                    let verdict = Verdict::reduce(entry.confidence(), [entry.label()]);
                    if let Some(err) = &entry.error {
                        log::warn!("request #{request_id}: backend reported: {err}");
                    }
                    ScenarioResult::classified(request_id, payload, response, verdict, entry.error)
                }
                Err(err) => {
                    log::warn!("simulation request #{request_id} failed: {err}");
                    ScenarioResult::failed(request_id, payload, err.to_string())
                }
            };
            results.push(result);
        }
        results
    }

    fn classify_row(&self, sent: &[ScanRow]) -> Result<(Value, MlResultEntry), ServiceError> {
        let body = self.service.predict_from_scan_json(sent)?;
        let decoded: PredictResponse = decode(PREDICT_FROM_SCAN_PATH, &body)?;
        match decoded.results.into_iter().next() {
            Some(entry) => {
                let raw = body
                    .get("results")
                    .and_then(|results| results.get(0))
                    .cloned()
                    .unwrap_or(Value::Null);
                Ok((raw, entry))
            }
            None => Ok((body, MlResultEntry::default())),
        }
    }
}

fn aggregate_result(batch: &PayloadBatch) -> ScenarioResult {
    let Some(remote) = &batch.remote else {
        return ScenarioResult::failed(
            1,
            json!(batch.rows),
            "run-attack unavailable; the local payload was not classified".to_string(),
        );
    };

    let response = &remote.response;
    let confidence = response
        .average_confidence
        .or_else(|| mean_confidence(response.results.iter().map(MlResultEntry::confidence)));
    let verdict = Verdict::reduce(confidence, response.results.iter().map(MlResultEntry::label));

    let failures = response
        .results
        .iter()
        .filter(|entry| entry.error.is_some())
        .count();
    let mut notes = Vec::new();
    if let Some(note) = &response.note {
        notes.push(note.clone());
    }
    if failures > 0 {
        log::warn!(
            "{failures} of {} aggregated classifications reported errors",
            response.results.len()
        );
        notes.push(format!(
            "{failures} of {} classifications reported errors",
            response.results.len()
        ));
    }
    let message = if notes.is_empty() {
        None
    } else {
        Some(notes.join("; "))
    };

    ScenarioResult::classified(
        1,
        Value::Array(response.payload.clone()),
        remote.body.clone(),
        verdict,
        message,
    )
}

fn supported_names() -> String {
    AttackKind::ALL
        .iter()
        .filter(|kind| kind.is_supported())
        .map(|kind| kind.run_name())
        .collect::<Vec<_>>()
        .join(", ")
}

// `trigger` takes `&mut self`, so a run cannot start while another is in progress.
#[derive(Debug)]
pub struct Session<S> {
    orchestrator: Orchestrator<S>,
    current: Option<SimulationRun>,
}

impl<S: ClassificationService> Session<S> {
    pub fn new(orchestrator: Orchestrator<S>) -> Self {
        Self {
            orchestrator,
            current: None,
        }
    }

    pub fn trigger(
        &mut self,
        attack: AttackKind,
        request_count: usize,
    ) -> Result<&SimulationRun, RunError> {
        let profile = attack.profile().ok_or(RunError::Unsupported(attack))?;
        self.current = None;
        let run = self.orchestrator.run_profile(&profile, request_count)?;
        Ok(&*self.current.insert(run))
    }

    pub fn current(&self) -> Option<&SimulationRun> {
        self.current.as_ref()
    }

    pub fn results(&self) -> &[ScenarioResult] {
        self.current
            .as_ref()
            .map(|run| run.results.as_slice())
            .unwrap_or_default()
    }
}

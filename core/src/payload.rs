use crate::attack::AttackKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const FALLBACK_PORT_PROBE: &str = include_str!("../data/port_probe_fallback.json");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanRow {
    pub timestamp: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub port: u16,
    pub state: String,
    #[serde(default)]
    pub banner: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PayloadError {
    #[error("payload row {index} is malformed: {reason}")]
    MalformedRow { index: usize, reason: String },
    #[error("payload is not a JSON array of scan rows: {0}")]
    Malformed(String),
}

impl ScanRow {
    pub(crate) fn with_default_banner(mut self, kind: AttackKind) -> Self {
        let missing = self.banner.as_deref().map_or(true, |b| b.trim().is_empty());
        if missing {
            self.banner = Some(format!("{} simulated", kind.run_name()));
        }
        self
    }
}

pub fn parse_rows(source: &str) -> Result<Vec<ScanRow>, PayloadError> {
    serde_json::from_str(source).map_err(|err| PayloadError::Malformed(err.to_string()))
}

pub fn rows_from_values(values: &[Value]) -> Result<Vec<ScanRow>, PayloadError> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            ScanRow::deserialize(value).map_err(|err| PayloadError::MalformedRow {
                index,
                reason: err.to_string(),
            })
        })
        .collect()
}

pub fn fallback_rows(kind: AttackKind) -> Vec<ScanRow> {
    match parse_rows(FALLBACK_PORT_PROBE) {
        Ok(rows) => rows
            .into_iter()
            .map(|row| row.with_default_banner(kind))
            .collect(),
        Err(err) => {
            log::error!("bundled fallback payload is unreadable: {err}");
            Vec::new()
        }
    }
}

pub fn select_row(rows: &[ScanRow], index: usize) -> Option<&ScanRow> {
    if rows.is_empty() {
        None
    } else {
        rows.get(index % rows.len())
    }
}

use crate::payload::{fallback_rows, ScanRow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const REQUEST_COUNT_OPTIONS: [usize; 3] = [100, 1000, 5000];

pub const DEFAULT_REQUEST_COUNT: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AttackKind {
    #[serde(rename = "Port Probing")]
    PortProbing,
    #[serde(rename = "DOS")]
    Dos,
    #[serde(rename = "XSS/SQL Injection")]
    XssSqlInjection,
    #[serde(rename = "Brute Force")]
    BruteForce,
    #[serde(rename = "Slowloris")]
    Slowloris,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    PerRow,
    Aggregate,
}

#[derive(Debug, Clone, Copy)]
pub struct AttackProfile {
    pub kind: AttackKind,
    pub mode: ClassificationMode,
    fallback: fn(AttackKind) -> Vec<ScanRow>,
}

impl AttackProfile {
    pub fn fallback_rows(&self) -> Vec<ScanRow> {
        (self.fallback)(self.kind)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown attack '{input}' (expected one of: {})", AttackKind::names().join(", "))]
pub struct AttackParseError {
    pub input: String,
}

impl AttackKind {
    pub const ALL: [AttackKind; 5] = [
        AttackKind::PortProbing,
        AttackKind::Dos,
        AttackKind::XssSqlInjection,
        AttackKind::BruteForce,
        AttackKind::Slowloris,
    ];

    pub fn run_name(self) -> &'static str {
        match self {
            AttackKind::PortProbing => "Port Probing",
            AttackKind::Dos => "DOS",
            AttackKind::XssSqlInjection => "XSS/SQL Injection",
            AttackKind::BruteForce => "Brute Force",
            AttackKind::Slowloris => "Slowloris",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.run_name()).collect()
    }

    pub fn profile(self) -> Option<AttackProfile> {
        match self {
            AttackKind::PortProbing => Some(AttackProfile {
                kind: self,
                mode: ClassificationMode::PerRow,
                fallback: fallback_rows,
            }),
            AttackKind::Dos => Some(AttackProfile {
                kind: self,
                mode: ClassificationMode::Aggregate,
                fallback: no_fallback,
            }),
            AttackKind::XssSqlInjection | AttackKind::BruteForce | AttackKind::Slowloris => None,
        }
    }

    pub fn is_supported(self) -> bool {
        self.profile().is_some()
    }
}

fn no_fallback(_: AttackKind) -> Vec<ScanRow> {
    Vec::new()
}

impl fmt::Display for AttackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.run_name())
    }
}

impl FromStr for AttackKind {
    type Err = AttackParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let kind = match normalized.as_str() {
            "port probing" | "port_probing" | "port-probing" | "portprobing" => {
                AttackKind::PortProbing
            }
            "dos" | "ddos" | "dos attack" | "denial of service" => AttackKind::Dos,
            "xss/sql injection" | "xss_sql_injection" | "xss" | "sqli" | "sql injection" => {
                AttackKind::XssSqlInjection
            }
            "brute force" | "brute_force" | "brute-force" | "bruteforce" => AttackKind::BruteForce,
            "slowloris" | "sloworis" => AttackKind::Slowloris,
            _ => {
                return Err(AttackParseError {
                    input: s.to_string(),
                })
            }
        };
        Ok(kind)
    }
}

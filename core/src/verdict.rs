use serde::{Deserialize, Serialize};

pub const DETECTION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub detected: bool,
    pub confidence: Option<f64>,
}

pub fn normalize_confidence(raw: Option<f64>) -> Option<f64> {
    raw.filter(|value| value.is_finite())
        .map(|value| value.clamp(0.0, 1.0))
}

pub fn mean_confidence<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values.into_iter().filter_map(normalize_confidence) {
        sum += value;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

impl Verdict {
    pub fn reduce<I>(confidence: Option<f64>, labels: I) -> Self
    where
        I: IntoIterator<Item = Option<bool>>,
    {
        if let Some(confidence) = normalize_confidence(confidence) {
            return Self {
                detected: confidence >= DETECTION_THRESHOLD,
                confidence: Some(confidence),
            };
        }

        let (positive, total) = labels
            .into_iter()
            .flatten()
            .fold((0usize, 0usize), |(positive, total), label| {
                (positive + usize::from(label), total + 1)
            });

        Self {
            detected: total > 0 && positive * 2 > total,
            confidence: None,
        }
    }
}

use crate::runtime::ScenarioResult;
use comfy_table::{presets::ASCII_FULL, Table};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct DetailOptions {
    pub payload: bool,
    pub response: bool,
}

impl DetailOptions {
    pub fn any(&self) -> bool {
        self.payload || self.response
    }
}

pub fn format_verdict(verdict: bool) -> &'static str {
    if verdict {
        "True"
    } else {
        "False"
    }
}

pub fn format_confidence(confidence: Option<f64>) -> String {
    match confidence {
        Some(value) => format!("{:.1}%", value * 100.0),
        None => "Not provided".to_string(),
    }
}

pub fn render_results_table(results: &[ScenarioResult]) -> String {
    let mut display = Table::new();
    display.load_preset(ASCII_FULL);
    display.set_header(vec![
        "#",
        "Verdict",
        "Confidence",
        "Port",
        "Target",
        "Notes",
    ]);

    for result in results {
        let first = first_payload_row(&result.payload);
        display.add_row(vec![
            result.request_id.to_string(),
            format_verdict(result.verdict).to_string(),
            format_confidence(result.confidence),
            field_to_string(first.and_then(|row| row.get("port"))),
            field_to_string(first.and_then(|row| row.get("target"))),
            notes(result),
        ]);
    }

    display.to_string()
}

pub fn render_details(results: &[ScenarioResult], options: DetailOptions) -> String {
    let mut out = String::new();
    if !options.any() {
        return out;
    }

    for result in results {
        out.push_str(&format!("Request #{}\n", result.request_id));
        if options.payload {
            out.push_str("  Input JSON:\n");
            push_indented(&mut out, &pretty(&result.payload));
        }
        if options.response {
            out.push_str("  Output JSON:\n");
            let response = result.response.clone().unwrap_or(Value::Null);
            push_indented(&mut out, &pretty(&response));
        }
    }
    out
}

fn notes(result: &ScenarioResult) -> String {
    let mut parts = Vec::new();
    if let Some(message) = &result.message {
        parts.push(format!("Backend reported: {message}"));
    }
    if let Some(error) = &result.error {
        parts.push(error.clone());
    }
    parts.join("; ")
}

fn first_payload_row(payload: &Value) -> Option<&Value> {
    match payload {
        Value::Array(rows) => rows.first(),
        Value::Object(_) => Some(payload),
        _ => None,
    }
}

fn field_to_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::Null) | None => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn push_indented(out: &mut String, text: &str) {
    for line in text.lines() {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_results() -> Vec<ScenarioResult> {
        vec![
            ScenarioResult {
                request_id: 1,
                payload: json!([{"timestamp": "t", "target": "192.168.50.253", "port": 22, "state": "open", "banner": "SSH-2.0"}]),
                response: Some(json!({"ml": {"is_port_probe": true, "confidence": 0.8125}})),
                verdict: true,
                confidence: Some(0.8125),
                message: None,
                error: None,
            },
            ScenarioResult {
                request_id: 2,
                payload: json!([{"timestamp": "t", "target": "192.168.50.253", "port": 23, "state": "closed", "banner": null}]),
                response: None,
                verdict: false,
                confidence: None,
                message: None,
                error: Some("predict-from-scan-json responded with 502".to_string()),
            },
            ScenarioResult {
                request_id: 1,
                payload: json!([{"msg": "malicious traffic"}]),
                response: Some(json!({"average_confidence": null})),
                verdict: false,
                confidence: None,
                message: Some("DoS simulation had errors".to_string()),
                error: None,
            },
        ]
    }

    #[test]
    fn confidence_renders_as_percentage() {
        assert_eq!(format_confidence(Some(0.73)), "73.0%");
        assert_eq!(format_confidence(Some(1.0)), "100.0%");
        assert_eq!(format_confidence(None), "Not provided");
    }

    #[test]
    fn table_lists_each_request() {
        let table = render_results_table(&sample_results());
        assert!(table.contains("Verdict"));
        assert!(table.contains("81.2%") || table.contains("81.3%"));
        assert!(table.contains("192.168.50.253"));
        assert!(table.contains("predict-from-scan-json responded with 502"));
        assert!(table.contains("Backend reported: DoS simulation had errors"));
        assert!(table.contains("Not provided"));
    }

    #[test]
    fn details_follow_options() {
        let results = sample_results();
        assert!(render_details(&results, DetailOptions::default()).is_empty());

        let payload_only = render_details(
            &results,
            DetailOptions {
                payload: true,
                response: false,
            },
        );
        assert!(payload_only.contains("Input JSON"));
        assert!(payload_only.contains("\"port\": 22"));
        assert!(!payload_only.contains("Output JSON"));

        let both = render_details(
            &results,
            DetailOptions {
                payload: true,
                response: true,
            },
        );
        assert!(both.contains("Output JSON"));
        assert!(both.contains("    null"));
    }
}

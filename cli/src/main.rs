use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use mlcasim_core::service::{decode, HEALTH_PATH};
use mlcasim_core::{
    fallback_rows, parse_rows, render_details, AttackKind, ClassificationService, DetailOptions,
    HealthStatus, HttpService, Orchestrator, ServiceConfig, Session, SimulationRun,
    DEFAULT_REQUEST_COUNT, REQUEST_COUNT_OPTIONS,
};
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(author, version, about = "Attack simulation client for the ML classification service")]
struct MlcasimCli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a simulation and print the classification verdicts
    Run {
        /// Attack to simulate (e.g. "Port Probing", "DOS")
        #[arg(long, short, value_parser = parse_attack, default_value = "Port Probing")]
        attack: AttackKind,
        /// Number of requests to send (100, 1000 or 5000)
        #[arg(long, short = 'n', value_parser = parse_request_count, default_value_t = DEFAULT_REQUEST_COUNT)]
        requests: usize,
        /// Output format
        #[arg(long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Print the JSON payload sent for each request
        #[arg(long)]
        show_payload: bool,
        /// Print the JSON response received for each request
        #[arg(long)]
        show_response: bool,
        /// Service base address (overrides MLCASIM_API_URL)
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,
        /// Scan rows (JSON array) to use instead of the bundled fallback sample
        #[arg(long, value_name = "PATH")]
        fallback: Option<PathBuf>,
    },
    /// List attack kinds and whether they can be simulated
    Attacks {
        /// Output format
        #[arg(long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the bundled fallback payload
    Sample {
        /// Attack whose banner defaults are applied
        #[arg(long, short, value_parser = parse_attack, default_value = "Port Probing")]
        attack: AttackKind,
        /// Output format
        #[arg(long, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Check that the classification service is reachable
    Health {
        /// Service base address (overrides MLCASIM_API_URL)
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        };
        write!(f, "{value}")
    }
}

fn main() -> anyhow::Result<()> {
    let cli = MlcasimCli::parse();
    dotenvy::dotenv().ok();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run {
            attack,
            requests,
            format,
            show_payload,
            show_response,
            base_url,
            fallback,
        } => {
            let config = load_config(base_url.as_deref());
            let mut orchestrator = Orchestrator::new(HttpService::new(config.clone()))
                .with_max_age(config.max_age_seconds);
            if let Some(path) = fallback {
                let rows = load_fallback(&path)?;
                orchestrator = orchestrator.with_fallback_rows(attack, rows);
            }

            let mut session = Session::new(orchestrator);
            if matches!(format, OutputFormat::Text) {
                println!("Sending {requests} request(s) to {}...\n", config.base_url);
            }
            let run = session.trigger(attack, requests)?;
            let details = DetailOptions {
                payload: show_payload,
                response: show_response,
            };
            output_run(run, &config, format, details)?;
        }
        Command::Attacks { format } => {
            output_attacks(format)?;
        }
        Command::Sample { attack, format } => {
            let rows = fallback_rows(attack);
            emit(&rows, format)?;
        }
        Command::Health { base_url } => {
            let config = load_config(base_url.as_deref());
            let service = HttpService::new(config);
            let body = service.health()?;
            let status: HealthStatus = decode(HEALTH_PATH, &body)?;
            let timestamp = status.timestamp.as_deref().unwrap_or("-");
            println!(
                "{} -> {} ({timestamp})",
                service.config().base_url,
                status.status
            );
            if !status.is_ok() {
                anyhow::bail!("service reported status '{}'", status.status);
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(base_url: Option<&str>) -> ServiceConfig {
    let config = ServiceConfig::from_env();
    match base_url {
        Some(url) => config.with_base_url(url),
        None => config,
    }
}

fn load_fallback(path: &Path) -> anyhow::Result<Vec<mlcasim_core::ScanRow>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read fallback payload {}", path.display()))?;
    let rows = parse_rows(&content)
        .with_context(|| format!("invalid fallback payload {}", path.display()))?;
    if rows.is_empty() {
        log::warn!("fallback payload {} has no rows", path.display());
    }
    Ok(rows)
}

fn output_run(
    run: &SimulationRun,
    config: &ServiceConfig,
    format: OutputFormat,
    details: DetailOptions,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Yaml => {
            let payload = json!({
                "service": config.base_url,
                "run": run,
            });
            emit(&payload, format)?;
        }
        OutputFormat::Text => {
            println!("{run}");
            if details.any() {
                println!("\n{}", render_details(&run.results, details));
            }
            if run.has_failures() {
                println!("\n[warn] some requests failed");
            }
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct AttackListing {
    name: &'static str,
    supported: bool,
    mode: Option<mlcasim_core::ClassificationMode>,
}

fn output_attacks(format: OutputFormat) -> anyhow::Result<()> {
    let listing: Vec<AttackListing> = AttackKind::ALL
        .iter()
        .map(|kind| AttackListing {
            name: kind.run_name(),
            supported: kind.is_supported(),
            mode: kind.profile().map(|profile| profile.mode),
        })
        .collect();

    match format {
        OutputFormat::Text => {
            println!("Attacks:");
            for entry in &listing {
                let status = if entry.supported {
                    "available"
                } else {
                    "not yet implemented"
                };
                println!("  - {} ({status})", entry.name);
            }
        }
        _ => emit(&listing, format)?,
    }
    Ok(())
}

fn emit<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(value)?;
            print!("{yaml}");
        }
    }
    Ok(())
}

fn parse_attack(s: &str) -> Result<AttackKind, String> {
    s.parse::<AttackKind>().map_err(|err| err.to_string())
}

fn parse_request_count(s: &str) -> Result<usize, String> {
    let value: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("expected a number, got '{s}'"))?;
    if REQUEST_COUNT_OPTIONS.contains(&value) {
        Ok(value)
    } else {
        let options: Vec<String> = REQUEST_COUNT_OPTIONS.iter().map(|n| n.to_string()).collect();
        Err(format!(
            "unsupported request count {value} (choose one of: {})",
            options.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        MlcasimCli::command().debug_assert();
    }

    #[test]
    fn request_count_is_limited_to_menu() {
        assert_eq!(parse_request_count("1000"), Ok(1000));
        let err = parse_request_count("7").unwrap_err();
        assert!(err.contains("100, 1000, 5000"));
        assert!(parse_request_count("many").is_err());
    }

    #[test]
    fn run_defaults_to_port_probing() {
        let cli = MlcasimCli::try_parse_from(["mlcasim", "run"]).unwrap();
        match cli.command {
            Command::Run {
                attack, requests, ..
            } => {
                assert_eq!(attack, AttackKind::PortProbing);
                assert_eq!(requests, DEFAULT_REQUEST_COUNT);
            }
            other => panic!("expected run command, got {other:?}"),
        }
    }

    #[test]
    fn attack_argument_accepts_aliases() {
        let cli =
            MlcasimCli::try_parse_from(["mlcasim", "run", "--attack", "ddos", "-n", "5000"]).unwrap();
        match cli.command {
            Command::Run {
                attack, requests, ..
            } => {
                assert_eq!(attack, AttackKind::Dos);
                assert_eq!(requests, 5000);
            }
            other => panic!("expected run command, got {other:?}"),
        }
        assert!(MlcasimCli::try_parse_from(["mlcasim", "run", "--attack", "phishing"]).is_err());
    }
}

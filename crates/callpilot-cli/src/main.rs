//! CallPilot - swarm appointment negotiation CLI
//!
//! The `callpilot` command negotiates one appointment with many providers at
//! once and reports the ranked result.
//!
//! ## Commands
//!
//! - `swarm`: Negotiate with every matching provider and rank the outcomes
//! - `providers`: List providers from a directory file
//! - `free-slots`: List free slots of the caller's calendar on a day

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use callpilot_core::capability::{CalendarSource, EmptyCalendar, SpeechSynthesizer};
use callpilot_core::metrics::METRICS;
use callpilot_core::telemetry::init_tracing;
use callpilot_core::{
    day_window, find_providers, free_slots, BookingRequest, Preferences, SwarmConfig,
    SwarmOrchestrator,
};
use callpilot_sources::{synthesizer_from_env, JsonCalendar, JsonProviderDirectory};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "callpilot")]
#[command(author = "CallPilot Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Negotiate an appointment with many providers at once", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Negotiate with every provider offering a service and rank the results
    Swarm(SwarmArgs),

    /// List providers from a directory file
    Providers {
        /// Provider directory (JSON)
        #[arg(short, long, env = "CALLPILOT_PROVIDERS")]
        providers: PathBuf,

        /// Only show providers of this service
        #[arg(short, long)]
        service: Option<String>,

        /// Maximum number of providers to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List free slots on the caller's calendar
    FreeSlots {
        /// Caller calendar (JSON)
        #[arg(short, long, env = "CALLPILOT_CALENDAR")]
        calendar: Option<PathBuf>,

        /// Day to check (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Start of the day (HH:MM, default 09:00)
        #[arg(long)]
        start: Option<String>,

        /// End of the day (HH:MM, default 17:00)
        #[arg(long)]
        end: Option<String>,

        /// Slot length in minutes
        #[arg(long, default_value_t = callpilot_core::calendar::DEFAULT_SLOT_MINUTES)]
        slot_minutes: i64,
    },
}

#[derive(Args, Debug, Clone)]
struct SwarmArgs {
    /// Provider directory (JSON)
    #[arg(short, long, env = "CALLPILOT_PROVIDERS")]
    providers: PathBuf,

    /// Caller calendar (JSON)
    #[arg(short, long, env = "CALLPILOT_CALENDAR")]
    calendar: Option<PathBuf>,

    /// Service to book (dentist, auto_repair, doctor, hairdresser)
    #[arg(short, long)]
    service: String,

    /// Preferred day (YYYY-MM-DD); requires --start and --end
    #[arg(long, requires_all = ["start", "end"])]
    date: Option<String>,

    /// Window start (HH:MM)
    #[arg(long, requires = "date")]
    start: Option<String>,

    /// Window end (HH:MM)
    #[arg(long, requires = "date")]
    end: Option<String>,

    #[arg(long, default_value_t = 0.6)]
    time_weight: f64,

    #[arg(long, default_value_t = 0.2)]
    rating_weight: f64,

    #[arg(long, default_value_t = 0.2)]
    distance_weight: f64,

    /// Maximum number of providers to call
    #[arg(short, long)]
    limit: Option<usize>,

    /// Maximum negotiations in flight (default: all at once)
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Per-provider deadline in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Simulated provider line latency in milliseconds
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Print progress events as NDJSON instead of the final result
    #[arg(long)]
    stream: bool,
}

impl SwarmArgs {
    fn request(&self) -> BookingRequest {
        let mut request = BookingRequest::new(&self.service).with_preferences(Preferences::new(
            self.time_weight,
            self.rating_weight,
            self.distance_weight,
        ));
        if let (Some(date), Some(start), Some(end)) = (&self.date, &self.start, &self.end) {
            request = request.with_window(date, start, end);
        }
        if let Some(limit) = self.limit {
            request = request.with_limit(limit);
        }
        request
    }

    /// `base` with any limits given on the command line applied on top.
    fn config(&self, base: SwarmConfig) -> SwarmConfig {
        let mut config = base;
        if let Some(max) = self.max_concurrency {
            config.max_concurrency = (max > 0).then_some(max);
        }
        if let Some(ms) = self.timeout_ms {
            config.provider_timeout_ms = ms;
        }
        if let Some(ms) = self.latency_ms {
            config.simulated_latency_ms = ms;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let mut stdout = std::io::stdout().lock();
    let outcome = match cli.command {
        Commands::Swarm(args) => {
            let config = args.config(SwarmConfig::from_env());
            cmd_swarm(&args, config, synthesizer_from_env(), &mut stdout).await
        }
        Commands::Providers {
            providers,
            service,
            limit,
        } => cmd_providers(&providers, service.as_deref(), limit, &mut stdout).await,
        Commands::FreeSlots {
            calendar,
            date,
            start,
            end,
            slot_minutes,
        } => {
            cmd_free_slots(
                calendar.as_deref(),
                &date,
                start.as_deref(),
                end.as_deref(),
                slot_minutes,
                &mut stdout,
            )
            .await
        }
    };

    METRICS.flush();
    outcome
}

fn calendar_source(path: Option<&Path>) -> Arc<dyn CalendarSource> {
    match path {
        Some(path) => Arc::new(JsonCalendar::new(path)),
        None => Arc::new(EmptyCalendar),
    }
}

/// Run a swarm and print the ranked result, or the event stream
async fn cmd_swarm(
    args: &SwarmArgs,
    config: SwarmConfig,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    out: &mut impl Write,
) -> Result<()> {
    let request = args.request();
    let directory = JsonProviderDirectory::new(&args.providers);
    let providers = find_providers(&directory, &request)
        .await
        .context("Failed to load providers")?;
    if providers.is_empty() {
        bail!(
            "no providers offer '{}' in {}",
            args.service,
            args.providers.display()
        );
    }
    info!(providers = providers.len(), service = %args.service, "starting swarm");

    let orchestrator = SwarmOrchestrator::new(config)
        .with_calendar(calendar_source(args.calendar.as_deref()))
        .with_synthesizer(synthesizer);

    if args.stream {
        let mut stream = orchestrator
            .negotiate_stream(&request, providers)
            .await
            .context("Invalid booking request")?;
        while let Some(event) = stream.next_event().await {
            writeln!(out, "{}", serde_json::to_string(&event)?)?;
            out.flush()?;
        }
    } else {
        let result = orchestrator
            .negotiate(&request, providers)
            .await
            .context("Invalid booking request")?;
        writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
    }
    Ok(())
}

/// List providers, optionally filtered by service
async fn cmd_providers(
    path: &Path,
    service: Option<&str>,
    limit: Option<usize>,
    out: &mut impl Write,
) -> Result<()> {
    let directory = JsonProviderDirectory::new(path);
    let providers = directory
        .load()
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let shown: Vec<_> = providers
        .iter()
        .filter(|p| service.map_or(true, |s| p.service == s))
        .take(limit.filter(|l| *l > 0).unwrap_or(usize::MAX))
        .collect();

    if shown.is_empty() {
        writeln!(out, "No providers found.")?;
        return Ok(());
    }
    for p in shown {
        let rating = p
            .known_rating()
            .map_or_else(|| "-".to_string(), |r| format!("{r:.1}"));
        let distance = p
            .distance_miles
            .map_or_else(|| "-".to_string(), |d| format!("{d:.1} mi"));
        writeln!(
            out,
            "{:<24} {:<32} {:<12} {:>4} {:>8}  {} slot(s)",
            p.id,
            p.name,
            p.service,
            rating,
            distance,
            p.availability.len()
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct FreeSlotsReport {
    date: String,
    available_slots: Vec<FreeSlotEntry>,
}

#[derive(Serialize)]
struct FreeSlotEntry {
    start: String,
    end: String,
}

/// Print the free slots of one day as JSON
async fn cmd_free_slots(
    calendar: Option<&Path>,
    date: &str,
    start: Option<&str>,
    end: Option<&str>,
    slot_minutes: i64,
    out: &mut impl Write,
) -> Result<()> {
    let window = day_window(date, start, end).context("Invalid time window")?;
    let busy = calendar_source(calendar)
        .busy_intervals()
        .await
        .context("Failed to read calendar")?;
    let slots = free_slots(&window, &busy, slot_minutes)?;

    let report = FreeSlotsReport {
        date: window.date.format("%Y-%m-%d").to_string(),
        available_slots: slots
            .iter()
            .map(|s| FreeSlotEntry {
                start: s.start.format("%H:%M").to_string(),
                end: s.end.format("%H:%M").to_string(),
            })
            .collect(),
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use callpilot_core::capability::NullSynthesizer;
    use serde_json::Value;

    const PROVIDERS: &str = r#"{"providers": [
        {"id": "d1", "name": "Bright Smiles", "service": "dentist",
         "availability": ["2026-02-08 09:00", "2026-02-08 14:00"], "rating": 4.5, "distance_miles": 1.0},
        {"id": "d2", "name": "Downtown Dental", "service": "dentist",
         "availability": ["2026-02-08 16:00"], "rating": 3.0, "distance_miles": 6.0},
        {"id": "m1", "name": "Main St Motors", "service": "auto_repair",
         "availability": ["2026-02-08 10:00"]}
    ]}"#;

    const CALENDAR: &str = r#"{"user_calendar": {"busy_slots": [
        {"start": "2026-02-08T14:00:00", "end": "2026-02-08T15:00:00"}
    ]}}"#;

    fn write_fixture(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn swarm_args(argv: &[&str]) -> SwarmArgs {
        let mut full = vec!["callpilot", "swarm"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Swarm(args) => args,
            _ => panic!("expected swarm command"),
        }
    }

    #[test]
    fn test_cli_parses_swarm_flags() {
        let cli = Cli::try_parse_from([
            "callpilot",
            "--verbose",
            "swarm",
            "--providers",
            "providers.json",
            "--service",
            "dentist",
            "--date",
            "2026-02-08",
            "--start",
            "13:00",
            "--end",
            "17:00",
            "--max-concurrency",
            "4",
            "--stream",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Swarm(args) = cli.command else {
            panic!("expected swarm command");
        };
        assert!(args.stream);
        assert_eq!(args.time_weight, 0.6);

        let config = args.config(SwarmConfig::default());
        assert_eq!(config.max_concurrency, Some(4));
        let request = args.request();
        assert_eq!(request.time_window.unwrap().start, "13:00");
    }

    #[test]
    fn test_cli_rejects_partial_window() {
        let parsed = Cli::try_parse_from([
            "callpilot",
            "swarm",
            "--providers",
            "p.json",
            "--service",
            "dentist",
            "--date",
            "2026-02-08",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_zero_concurrency_flag_means_unbounded() {
        let args = swarm_args(&["-p", "p.json", "-s", "doctor", "--max-concurrency", "0"]);
        let base = SwarmConfig::default().with_max_concurrency(8);
        assert_eq!(args.config(base).max_concurrency, None);
    }

    #[tokio::test]
    async fn test_cmd_swarm_prints_ranked_result() {
        let dir = tempfile::tempdir().unwrap();
        let providers = write_fixture(&dir, "providers.json", PROVIDERS);
        let calendar = write_fixture(&dir, "calendar.json", CALENDAR);
        let args = swarm_args(&[
            "-p",
            providers.to_str().unwrap(),
            "-c",
            calendar.to_str().unwrap(),
            "-s",
            "dentist",
            "--date",
            "2026-02-08",
            "--start",
            "13:00",
            "--end",
            "17:00",
        ]);

        let mut out = Vec::new();
        cmd_swarm(&args, args.config(SwarmConfig::default()), Arc::new(NullSynthesizer), &mut out)
            .await
            .unwrap();

        let result: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(result["status"], "ok");
        assert_eq!(result["ranked"].as_array().unwrap().len(), 2);
        // d1's only in-window slot is blocked by the calendar.
        assert_eq!(result["best"]["provider"]["id"], "d2");
        assert_eq!(result["ranked"][1]["status"], "no_availability");
    }

    #[tokio::test]
    async fn test_cmd_swarm_streams_ndjson() {
        let dir = tempfile::tempdir().unwrap();
        let providers = write_fixture(&dir, "providers.json", PROVIDERS);
        let args = swarm_args(&["-p", providers.to_str().unwrap(), "-s", "dentist", "--stream"]);

        let mut out = Vec::new();
        cmd_swarm(&args, args.config(SwarmConfig::default()), Arc::new(NullSynthesizer), &mut out)
            .await
            .unwrap();

        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines.last().unwrap()["type"], "summary");
        assert_eq!(
            lines
                .iter()
                .filter(|l| l["type"] == "negotiation_started")
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_cmd_swarm_fails_without_providers() {
        let dir = tempfile::tempdir().unwrap();
        let providers = write_fixture(&dir, "providers.json", PROVIDERS);
        let args = swarm_args(&["-p", providers.to_str().unwrap(), "-s", "hairdresser"]);

        let mut out = Vec::new();
        let err = cmd_swarm(&args, SwarmConfig::default(), Arc::new(NullSynthesizer), &mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no providers offer 'hairdresser'"));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_cmd_swarm_rejects_unknown_service() {
        let dir = tempfile::tempdir().unwrap();
        let providers = write_fixture(&dir, "providers.json", PROVIDERS);
        let args = swarm_args(&["-p", providers.to_str().unwrap(), "-s", "plumber"]);

        let mut out = Vec::new();
        let err = cmd_swarm(&args, SwarmConfig::default(), Arc::new(NullSynthesizer), &mut out)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("unsupported service: plumber"));
    }

    #[tokio::test]
    async fn test_cmd_providers_filters_and_limits() {
        let dir = tempfile::tempdir().unwrap();
        let providers = write_fixture(&dir, "providers.json", PROVIDERS);

        let mut out = Vec::new();
        cmd_providers(&providers, Some("dentist"), Some(1), &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("Bright Smiles"));
        assert!(text.contains("4.5"));

        let mut out = Vec::new();
        cmd_providers(&providers, Some("doctor"), None, &mut out)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "No providers found.");
    }

    #[tokio::test]
    async fn test_cmd_free_slots_skips_busy_hours() {
        let dir = tempfile::tempdir().unwrap();
        let calendar = write_fixture(&dir, "calendar.json", CALENDAR);

        let mut out = Vec::new();
        cmd_free_slots(Some(&calendar), "2026-02-08", Some("13:00"), Some("17:00"), 60, &mut out)
            .await
            .unwrap();
        let report: Value = serde_json::from_slice(&out).unwrap();
        let starts: Vec<&str> = report["available_slots"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["start"].as_str().unwrap())
            .collect();
        assert_eq!(starts, vec!["13:00", "15:00", "16:00"]);
        assert_eq!(report["date"], "2026-02-08");
    }

    #[tokio::test]
    async fn test_cmd_free_slots_rejects_inverted_window() {
        let mut out = Vec::new();
        let err = cmd_free_slots(None, "2026-02-08", Some("17:00"), Some("09:00"), 60, &mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid time window"));
    }
}

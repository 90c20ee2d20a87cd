use anyhow::{Context, Result};
use clap::Parser;
use lotto_simulator::{Api, Simulator, SimulatorConfig};
use lotto_types::{
    amount,
    game::{DEFAULT_CONTRIBUTION_BPS, DEFAULT_FIXED_PRIZES, DEFAULT_PICK_COUNT, DEFAULT_POOL_SIZE},
    GameRules, JackpotConfig,
};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() -> Result<()> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .ok()
        .and_then(|value| {
            let trimmed = value.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        });

    if let Some(endpoint) = endpoint {
        let service_name = std::env::var("OTEL_SERVICE_NAME")
            .unwrap_or_else(|_| "lotto-simulator".to_string());
        let rate = std::env::var("OTEL_SAMPLING_RATE")
            .ok()
            .and_then(|value| value.parse::<f64>().ok())
            .map(|value| value.clamp(0.0, 1.0))
            .unwrap_or(1.0);
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()
            .context("failed to build OTLP exporter")?;
        let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(rate))
            .with_resource(
                opentelemetry_sdk::Resource::builder_empty()
                    .with_attributes([opentelemetry::KeyValue::new("service.name", service_name)])
                    .build(),
            )
            .with_batch_exporter(exporter)
            .build();
        let tracer = tracer_provider.tracer("lotto-simulator");
        opentelemetry::global::set_tracer_provider(tracer_provider);

        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_filter(LevelFilter::INFO))
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    Ok(())
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host interface to bind (default: localhost).
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Seed used by runs whose request carries none (optional).
    #[arg(long)]
    deterministic_seed: Option<u64>,

    /// Maximum number of history points kept per run (0 disables limit).
    #[arg(long)]
    history_max_points: Option<usize>,

    /// Maximum number of jackpot hits kept per run (0 disables limit).
    #[arg(long)]
    jackpot_hits_max: Option<usize>,

    /// Size of the number pool balls are drawn from.
    #[arg(long, default_value_t = DEFAULT_POOL_SIZE)]
    pool_size: u8,

    /// Numbers drawn per round and picked per ticket.
    #[arg(long, default_value_t = DEFAULT_PICK_COUNT)]
    pick_count: u8,

    /// Jackpot floor in currency units (pool value after a reset).
    #[arg(long)]
    jackpot_floor: Option<f64>,

    /// Share of each round's bets added to the jackpot, in basis points.
    #[arg(long, default_value_t = DEFAULT_CONTRIBUTION_BPS)]
    contribution_bps: u16,

    /// Share of each contribution that repays the jackpot seed, in basis points.
    #[arg(long, default_value_t = 0)]
    seed_repay_bps: u16,

    /// Fixed prizes for tiers 2.. in currency units, comma separated.
    #[arg(long, value_delimiter = ',')]
    fixed_prizes: Option<Vec<f64>>,

    /// HTTP rate limit per IP in requests per second (0 disables rate limiting).
    #[arg(long)]
    http_rate_limit_per_second: Option<u64>,

    /// HTTP rate limit burst size (0 disables rate limiting).
    #[arg(long)]
    http_rate_limit_burst: Option<u32>,

    /// Simulate endpoint rate limit per IP in requests per minute (default: 60).
    #[arg(long)]
    simulate_rate_limit_per_minute: Option<u64>,

    /// Simulate endpoint rate limit burst size (default: 10).
    #[arg(long)]
    simulate_rate_limit_burst: Option<u32>,

    /// Max request body size in bytes (0 disables limit).
    #[arg(long)]
    http_body_limit_bytes: Option<usize>,
}

fn is_production() -> bool {
    matches!(
        std::env::var("NODE_ENV").as_deref(),
        Ok("production") | Ok("prod")
    )
}

/// Maps an optional arg value to Option: 0 => None, Some(v) => Some(v), None => default
fn map_optional_limit<T: Copy + PartialEq + From<u8>>(
    arg: Option<T>,
    default: Option<T>,
) -> Option<T> {
    match arg {
        Some(v) if v == T::from(0) => None,
        Some(v) => Some(v),
        None => default,
    }
}

fn parse_units(field: &str, value: f64) -> Result<u64> {
    amount::from_units(value).with_context(|| format!("invalid {field}: {value}"))
}

fn build_rules(args: &Args) -> Result<GameRules> {
    let defaults = JackpotConfig::default();
    let floor = match args.jackpot_floor {
        Some(value) => parse_units("jackpot_floor", value)?,
        None => defaults.floor,
    };
    let fixed_prizes = match &args.fixed_prizes {
        Some(values) => values
            .iter()
            .map(|value| parse_units("fixed_prizes", *value))
            .collect::<Result<Vec<_>>>()?,
        None => DEFAULT_FIXED_PRIZES.to_vec(),
    };
    let jackpot = JackpotConfig {
        floor,
        contribution_bps: args.contribution_bps,
        seed_repay_bps: args.seed_repay_bps,
    };
    let rules = GameRules::new(args.pool_size, args.pick_count, &fixed_prizes, jackpot)
        .context("invalid game rules")?;
    if let Some(largest) = floor_below_fixed_prize(&rules) {
        warn!(
            jackpot_floor = amount::to_units(rules.jackpot.floor),
            largest_fixed_prize = amount::to_units(largest),
            "jackpot floor is below the largest fixed prize"
        );
    }
    Ok(rules)
}

/// Largest fixed prize when it exceeds the jackpot floor.
fn floor_below_fixed_prize(rules: &GameRules) -> Option<u64> {
    rules
        .largest_fixed_prize()
        .filter(|largest| *largest > rules.jackpot.floor)
}

fn build_config(args: &Args) -> Result<SimulatorConfig> {
    let defaults = SimulatorConfig::default();
    Ok(SimulatorConfig {
        history_max_points: map_optional_limit(
            args.history_max_points,
            defaults.history_max_points,
        ),
        jackpot_hits_max: map_optional_limit(args.jackpot_hits_max, defaults.jackpot_hits_max),
        deterministic_seed: args.deterministic_seed.or(defaults.deterministic_seed),
        http_rate_limit_per_second: map_optional_limit(
            args.http_rate_limit_per_second,
            defaults.http_rate_limit_per_second,
        ),
        http_rate_limit_burst: map_optional_limit(
            args.http_rate_limit_burst,
            defaults.http_rate_limit_burst,
        ),
        simulate_rate_limit_per_minute: map_optional_limit(
            args.simulate_rate_limit_per_minute,
            defaults.simulate_rate_limit_per_minute,
        ),
        simulate_rate_limit_burst: map_optional_limit(
            args.simulate_rate_limit_burst,
            defaults.simulate_rate_limit_burst,
        ),
        http_body_limit_bytes: map_optional_limit(
            args.http_body_limit_bytes,
            defaults.http_body_limit_bytes,
        ),
        rules: build_rules(args)?,
    })
}

fn require_env(var: &str) -> Result<String> {
    let value = std::env::var(var).unwrap_or_default();
    if value.trim().is_empty() {
        anyhow::bail!("Missing required env: {var}");
    }
    Ok(value)
}

fn require_positive_u64(var: &str) -> Result<()> {
    let value = require_env(var)?;
    let parsed: u64 = value
        .parse()
        .with_context(|| format!("Invalid {var}: {value}"))?;
    if parsed == 0 {
        anyhow::bail!("Invalid {var}: {value}");
    }
    Ok(())
}

fn ensure_production_env() -> Result<()> {
    if !is_production() {
        return Ok(());
    }

    require_env("ALLOWED_HTTP_ORIGINS")?;
    require_env("METRICS_AUTH_TOKEN")?;
    require_positive_u64("RATE_LIMIT_HTTP_PER_SEC")?;
    require_positive_u64("RATE_LIMIT_HTTP_BURST")?;
    require_positive_u64("RATE_LIMIT_SIMULATE_PER_MIN")?;
    require_positive_u64("RATE_LIMIT_SIMULATE_BURST")?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse args
    let args = Args::parse();

    // Create logger
    init_tracing()?;

    ensure_production_env()?;

    let config = build_config(&args)?;
    info!(
        pool_size = config.rules.pool_size,
        pick_count = config.rules.pick_count,
        tiers = config.rules.tier_count(),
        jackpot_floor = amount::to_units(config.rules.jackpot.floor),
        "game rules loaded"
    );

    let simulator = Arc::new(Simulator::new_with_config(config).context("invalid game rules")?);
    let api = Api::new(simulator);
    let app = api.router();

    // Start server
    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("axum server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let args = Args::parse_from(["simulator"]);
        let config = build_config(&args).expect("config should parse");
        assert_eq!(config.rules, GameRules::default());
        assert_eq!(config.deterministic_seed, None);
        assert_eq!(
            config.history_max_points,
            SimulatorConfig::default().history_max_points
        );
    }

    #[test]
    fn zero_disables_limits() {
        let args = Args::parse_from([
            "simulator",
            "--history-max-points",
            "0",
            "--http-rate-limit-per-second",
            "0",
            "--deterministic-seed",
            "7",
        ]);
        let config = build_config(&args).expect("config should parse");
        assert_eq!(config.history_max_points, None);
        assert_eq!(config.http_rate_limit_per_second, None);
        assert_eq!(config.deterministic_seed, Some(7));
    }

    #[test]
    fn parses_custom_rules() {
        let args = Args::parse_from([
            "simulator",
            "--pool-size",
            "49",
            "--pick-count",
            "6",
            "--jackpot-floor",
            "500000",
            "--fixed-prizes",
            "1000,50,10,2",
        ]);
        let config = build_config(&args).expect("config should parse");
        assert_eq!(config.rules.pool_size, 49);
        assert_eq!(config.rules.jackpot.floor, 50_000_000);
        assert_eq!(config.rules.tier_count(), 5);
    }

    #[test]
    fn detects_floor_below_fixed_prize() {
        let args = Args::parse_from(["simulator"]);
        let config = build_config(&args).expect("config should parse");
        assert_eq!(floor_below_fixed_prize(&config.rules), None);

        let args = Args::parse_from([
            "simulator",
            "--jackpot-floor",
            "100",
            "--fixed-prizes",
            "1000,50,100,2",
        ]);
        let config = build_config(&args).expect("low floor is accepted");
        assert_eq!(config.rules.jackpot.floor, 10_000);
        assert_eq!(floor_below_fixed_prize(&config.rules), Some(100_000));

        let args = Args::parse_from([
            "simulator",
            "--jackpot-floor",
            "1000",
            "--fixed-prizes",
            "1000,50",
        ]);
        let config = build_config(&args).expect("config should parse");
        assert_eq!(floor_below_fixed_prize(&config.rules), None);
    }

    #[test]
    fn rejects_invalid_rules() {
        let args = Args::parse_from(["simulator", "--pick-count", "50"]);
        let err = build_config(&args).unwrap_err();
        assert!(
            err.to_string().contains("invalid game rules"),
            "unexpected error: {err}"
        );

        let args = Args::parse_from(["simulator", "--jackpot-floor=-5"]);
        let err = build_config(&args).unwrap_err();
        assert!(err.to_string().contains("jackpot_floor"), "unexpected error: {err}");
    }
}

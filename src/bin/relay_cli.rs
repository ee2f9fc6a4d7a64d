//! relay-cli: 通过弹性编排层批量抓取上游数据的命令行工具
//!
//! Usage:
//!   relay-cli fetch [OPTIONS] <url>...     Fetch URLs as one batch, one JSON line per item
//!   relay-cli config [--file <path>]       Print the effective configuration

use anyhow::{bail, Context};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use upstream_relay::{BatchMode, HttpUpstream, Relay, RelayConfig, RequestSpec};

fn print_usage() {
    println!(
        r#"relay-cli: resilient batch fetcher

USAGE:
    relay-cli <COMMAND> [OPTIONS]

COMMANDS:
    fetch [OPTIONS] <url>...    Fetch every URL as one batch
    config [--file <path>]      Print the effective configuration (YAML)
    version                     Show version information
    help                        Show this help message

FETCH OPTIONS:
    --file <path>               YAML config file (env overrides still apply)
    --base-url <url>            Resolve relative targets against this URL
    --concurrency <n>           Items in flight at once
    --timeout-ms <n>            Per-attempt deadline
    --attempts <n>              Total attempts per item
    --pooled                    Refill slots as soon as they free up
    --identity <name>           Caller identity for admission (default: cli)

ENVIRONMENT:
    RELAY_*                     Configuration overrides (see RelayConfig)
    RUST_LOG                    Log filter (e.g. upstream_relay=debug)"#
    );
}

#[derive(Debug, Default)]
struct FetchArgs {
    file: Option<String>,
    base_url: Option<String>,
    concurrency: Option<usize>,
    timeout_ms: Option<u64>,
    attempts: Option<u32>,
    pooled: bool,
    identity: Option<String>,
    targets: Vec<String>,
}

fn flag_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> anyhow::Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("{flag} requires a value"))
}

fn parse_fetch_args(args: &[String]) -> anyhow::Result<FetchArgs> {
    let mut out = FetchArgs::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--file" => out.file = Some(flag_value(args, &mut i, "--file")?.to_string()),
            "--base-url" => out.base_url = Some(flag_value(args, &mut i, "--base-url")?.to_string()),
            "--concurrency" => {
                out.concurrency = Some(flag_value(args, &mut i, "--concurrency")?.parse()?)
            }
            "--timeout-ms" => out.timeout_ms = Some(flag_value(args, &mut i, "--timeout-ms")?.parse()?),
            "--attempts" => out.attempts = Some(flag_value(args, &mut i, "--attempts")?.parse()?),
            "--identity" => out.identity = Some(flag_value(args, &mut i, "--identity")?.to_string()),
            "--pooled" => out.pooled = true,
            other if other.starts_with("--") => bail!("unknown option: {other}"),
            target => out.targets.push(target.to_string()),
        }
        i += 1;
    }
    Ok(out)
}

fn load_config(file: Option<&str>) -> anyhow::Result<RelayConfig> {
    let base = match file {
        Some(path) => RelayConfig::from_yaml_file(path)
            .with_context(|| format!("cannot load config from {path}"))?,
        None => RelayConfig::default(),
    };
    Ok(base.with_env_overrides())
}

fn file_flag(args: &[String]) -> Option<&str> {
    args.iter()
        .position(|a| a == "--file")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn cmd_config(args: &[String]) -> anyhow::Result<bool> {
    let config = load_config(file_flag(args))?;
    config.validate()?;
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(true)
}

async fn cmd_fetch(args: &[String]) -> anyhow::Result<bool> {
    let args = parse_fetch_args(args)?;
    if args.targets.is_empty() {
        bail!("fetch needs at least one URL");
    }

    let mut config = load_config(args.file.as_deref())?;
    if let Some(ms) = args.timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }
    if let Some(n) = args.attempts {
        config = config.with_max_attempts(n);
    }
    if args.pooled {
        config = config.with_batch_mode(BatchMode::Pooled);
    }

    let mut upstream = HttpUpstream::new()?;
    if let Some(base) = &args.base_url {
        upstream = upstream.with_base_url(base)?;
    }
    let relay = Relay::builder(upstream)
        .with_config(config)
        .with_observer(std::sync::Arc::new(upstream_relay::executor::TracingObserver))
        .build()?;

    let identity = args.identity.as_deref().unwrap_or("cli");
    let specs = args.targets.iter().map(RequestSpec::get).collect();
    let result = relay.fetch_batch(identity, specs, args.concurrency).await?;

    for (index, item) in result.iter().enumerate() {
        let line = match item {
            Ok(value) => serde_json::json!({ "index": index, "ok": true, "value": value }),
            Err(failure) => serde_json::json!({
                "index": index,
                "ok": false,
                "error": failure.kind(),
                "message": failure.to_string(),
            }),
        };
        println!("{line}");
    }
    eprintln!(
        "{}/{} succeeded in {}ms",
        result.success_count(),
        result.len(),
        result.execution_time().as_millis()
    );
    Ok(result.all_succeeded())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let outcome = match args[1].as_str() {
        "fetch" => cmd_fetch(&args[2..]).await,
        "config" => cmd_config(&args[2..]),
        "version" | "--version" | "-V" => {
            println!("relay-cli {}", env!("CARGO_PKG_VERSION"));
            Ok(true)
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(true)
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

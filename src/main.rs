//! Command-line front end for the narrator.
//!
//! - Parse command-line arguments.
//! - Load configuration from `conf/narrator.toml` (or `--config`).
//! - Load the post JSON and print the narration plan, or run it on a
//!   virtual clock with `--simulate`.

use anyhow::{Context, Result, anyhow};
use blog_narrator::config::{DEFAULT_CONFIG_PATH, load_config};
use blog_narrator::narration::NarrationController;
use blog_narrator::post::load_post;
use blog_narrator::progress::format_timestamp;
use blog_narrator::simulate::dry_run;
use blog_narrator::tts::RecordingSynthesizer;
use std::env;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage: narrate <post.json> [--config <path>] [--simulate] [--json]";

#[derive(Debug)]
struct Args {
    post_path: PathBuf,
    config_path: PathBuf,
    simulate: bool,
    json: bool,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let config = load_config(&args.config_path);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        path = %args.post_path.display(),
        level = %config.log_level,
        "Starting narrator"
    );

    let post = load_post(&args.post_path)?;

    if args.simulate {
        let report = dry_run(&post, config).context("Dry run failed")?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }
        for utterance in &report.utterances {
            println!(
                "[{:>6.1}s] #{:<3} {:>5.1}%  {}",
                utterance.started_at_ms as f64 / 1000.0,
                utterance.chunk_index,
                utterance.percent_at_start,
                utterance.text
            );
        }
        println!(
            "{} after {:.1}s ({} / {})",
            report.snapshot.status.label(),
            report.total_ms as f64 / 1000.0,
            report.snapshot.elapsed_label,
            report.snapshot.total_label
        );
        return Ok(());
    }

    let mut controller = NarrationController::new(RecordingSynthesizer::new(), config);
    controller.load_post(&post);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&controller.snapshot())?);
        return Ok(());
    }

    println!("{}", post.title);
    println!(
        "{} chunks, about {} at {}",
        controller.chunks().len(),
        format_timestamp(controller.progress().estimated_duration_secs as f64),
        controller.speed()
    );
    match controller.voice() {
        Some(voice) => println!("voice: {} ({})", voice.name, voice.lang),
        None => println!("voice: platform default"),
    }
    for (idx, chunk) in controller.chunks().iter().enumerate() {
        println!("{idx:>4}  {chunk}");
    }
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut post_path = None;
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut simulate = false;
    let mut json = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--simulate" => simulate = true,
            "--json" => json = true,
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("--config needs a path\n{USAGE}"))?;
                config_path = PathBuf::from(value);
            }
            flag if flag.starts_with("--") => {
                return Err(anyhow!("Unknown option {flag}\n{USAGE}"));
            }
            _ if post_path.is_none() => post_path = Some(PathBuf::from(&arg)),
            _ => return Err(anyhow!("Unexpected argument {arg}\n{USAGE}")),
        }
    }

    let post_path = post_path.ok_or_else(|| anyhow!(USAGE))?;
    if !post_path.exists() {
        return Err(anyhow!("File not found: {}", post_path.display()));
    }
    Ok(Args {
        post_path,
        config_path,
        simulate,
        json,
    })
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}

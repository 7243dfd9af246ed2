use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use zone_signal::config::load_config;
use zone_signal::{Cli, CooldownGate, SignalEngine, SignalRequest};

fn read_request(args: &Cli) -> Result<SignalRequest> {
    let raw = if args.reads_stdin() {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        buf
    } else {
        let path = args.input.as_deref().context("No input path")?;
        fs::read_to_string(path).with_context(|| format!("Failed to read request file {}", path.display()))?
    };

    let mut request: SignalRequest = serde_json::from_str(&raw).context("Request is not valid JSON")?;
    if let Some(symbol) = &args.symbol {
        request.symbol = symbol.clone();
    }
    Ok(request)
}

fn run(args: &Cli) -> Result<String> {
    let config = load_config(args.mode, args.config.as_deref())?;
    let request = read_request(args)?;

    let mut engine = SignalEngine::new(config);
    if config.cooldown.enabled {
        engine = engine.with_cooldown(CooldownGate::from_settings(&config.cooldown));
    }

    let response = engine.evaluate(&request)?;
    log::info!(
        "{} [{}]: {} confidence={:.2}{}",
        response.symbol,
        args.mode,
        response.signal,
        response.confidence,
        response.reason.map(|r| format!(" reason={}", r)).unwrap_or_default()
    );

    let json = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    Ok(json)
}

fn main() -> ExitCode {
    // A. Init Logging (stderr; stdout carries the response)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // B. Parse Args
    let args = Cli::parse();
    #[cfg(debug_assertions)]
    log::debug!("Parsed arguments: {:?}", args);

    // C. Evaluate
    match run(&args) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{:#}", e);
            let body = serde_json::json!({
                "error": "internal_error",
                "message": format!("{:#}", e),
            });
            println!("{}", body);
            ExitCode::FAILURE
        }
    }
}

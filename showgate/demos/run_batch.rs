//! Batch runner example
//!
//! Reads a show request as JSON, runs it against the devices it names and
//! prints the batch result as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example run_batch -- request.json
//! cat request.json | cargo run --example run_batch
//! cargo run --example run_batch -- --catalog
//! ```
//!
//! A request looks like:
//!
//! ```json
//! {
//!   "devices": [{"hostname": "10.0.0.1", "username": "admin", "password": "x", "os": "iosxe"}],
//!   "commands": ["show version", {"command": "show ip interface brief", "pipe_option": "include", "pipe_value": "up"}],
//!   "output_format": "both"
//! }
//! ```
//!
//! Relay settings come from `JUMPHOST_HOST`, `JUMPHOST_USERNAME` and
//! `JUMPHOST_KEY_PATH`. Set `"use_jumphost": true` in the request to use them.
//! Rejected requests exit with status 2.

use std::env;
use std::io::{self, Read};
use std::process::ExitCode;

use showgate::{FilterOperator, Orchestrator, PlatformFamily, ServiceConfig, ShowRequest};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|a| a == "--catalog") {
        println!("{}", PlatformFamily::catalog());
        println!("{}", FilterOperator::catalog());
        return Ok(ExitCode::SUCCESS);
    }

    let input = match args.first() {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let config = ServiceConfig::from_env()?;
    let request: ShowRequest = serde_json::from_str(&input)?;

    // Ctrl-C stops devices that have not been contacted yet
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let orchestrator = Orchestrator::ssh(&config);
    match orchestrator.execute(&request, &cancel).await {
        Ok(batch) => {
            println!("{}", serde_json::to_string_pretty(&batch)?);
            eprintln!(
                "{} of {} devices succeeded",
                batch.succeeded_devices, batch.total_devices
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_client_error() => {
            eprintln!("Request rejected: {}", e);
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e.into()),
    }
}

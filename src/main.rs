//! startup-evaluator: question generation and pitch evaluation service.
//!
//! Usage:
//!   startup-evaluator                      # same as `serve`
//!   startup-evaluator serve --bind 0.0.0.0:8000
//!   startup-evaluator questions --profile profile.json
//!   startup-evaluator evaluate --request request.json --no-enhance

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use startup_evaluator::{
    config::{Config, DEFAULT_LOG_FILTER},
    http::{AppState, start_http_server},
    profile::StartupProfile,
    reports::ReportLog,
    service::{EvaluationRequest, EvaluatorService, QuestionRequest},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "startup-evaluator")]
#[command(about = "Startup pitch question generation and evaluation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Listen address (overrides SEVAL_HTTP_BIND)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Generate questions for one profile and print them as JSON
    Questions {
        /// Profile JSON, inline or as a file path
        #[arg(long)]
        profile: String,
        /// Skip the secondary enhancer
        #[arg(long)]
        no_enhance: bool,
    },
    /// Evaluate one set of answers and print the result as JSON
    Evaluate {
        /// EvaluationRequest JSON, inline or as a file path
        #[arg(long)]
        request: String,
        /// Skip the secondary enhancer
        #[arg(long)]
        no_enhance: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so the offline commands keep stdout clean for JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;
    let service = Arc::new(EvaluatorService::from_config(&config)?);

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or(config.runtime.http_bind);
            let reports = if config.runtime.reports_enabled {
                info!("Report log at {}", config.runtime.reports_path.display());
                Some(Arc::new(ReportLog::new(config.runtime.reports_path.clone())))
            } else {
                info!("Report log disabled");
                None
            };
            start_http_server(AppState::new(service, reports), bind).await
        }
        Commands::Questions {
            profile,
            no_enhance,
        } => {
            let profile: StartupProfile = read_json_arg(&profile)?;
            let request = QuestionRequest {
                profile,
                enhance_with_secondary: !no_enhance,
            };
            let response = service.generate_questions(&request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Commands::Evaluate {
            request,
            no_enhance,
        } => {
            let mut request: EvaluationRequest = read_json_arg(&request)?;
            if no_enhance {
                request.enhance_with_secondary = false;
            }
            let response = service.evaluate_startup(&request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

/// Inline JSON when the argument looks like an object, otherwise a file path.
fn read_json_arg<T: DeserializeOwned>(arg: &str) -> Result<T> {
    let text = if arg.trim_start().starts_with('{') {
        arg.to_string()
    } else {
        std::fs::read_to_string(arg).with_context(|| format!("Failed to read {}", arg))?
    };
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", arg))
}

use std::path::PathBuf;

use axum::http::{header, HeaderMap, HeaderValue};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use url::Url;

use edge_router::config::{load_config, RouterConfig};
use edge_router::routing::{RouteDecision, RoutingEngine};

#[derive(Parser)]
#[command(name = "router-cli")]
#[command(about = "Inspect edge router decisions offline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a URL would be routed, without any network I/O
    Classify {
        /// Full inbound URL, e.g. https://opencollective.com/webpack
        url: String,

        /// Accept-Language header to negotiate with
        #[arg(long)]
        accept_language: Option<String>,

        /// Cookie header to negotiate with
        #[arg(long)]
        cookie: Option<String>,

        /// Configuration file; built-in defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    Check {
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Classify {
            url,
            accept_language,
            cookie,
            config,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => RouterConfig::default(),
            };
            let engine = RoutingEngine::from_config(&config)?;

            let mut headers = HeaderMap::new();
            if let Some(value) = accept_language {
                headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_str(&value)?);
            }
            if let Some(value) = cookie {
                headers.insert(header::COOKIE, HeaderValue::from_str(&value)?);
            }

            let decision = engine.route(&Url::parse(&url)?, &headers);
            println!("{}", serde_json::to_string_pretty(&describe(&decision))?);
        }
        Commands::Check { file } => match load_config(&file) {
            Ok(config) => {
                let engine = RoutingEngine::from_config(&config)?;
                println!(
                    "{}: ok ({} rules, {} redirects)",
                    file.display(),
                    engine.classifier().rules().len(),
                    config.redirects.len()
                );
            }
            Err(e) => {
                eprintln!("{}: {}", file.display(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

fn describe(decision: &RouteDecision) -> Value {
    match decision {
        RouteDecision::Redirect { backend, location } => json!({
            "action": "redirect",
            "backend": backend,
            "status": 301,
            "location": location,
        }),
        RouteDecision::Forward(forward) => {
            let diagnostics: Map<String, Value> = forward
                .diagnostics
                .iter()
                .map(|(name, value)| {
                    let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                    (name.as_str().to_string(), Value::String(value))
                })
                .collect();

            json!({
                "action": "forward",
                "backend": forward.backend,
                "environment": forward.environment,
                "rule": forward.rule,
                "language": forward.language.as_ref().map(|l| &l.tag),
                "url": forward.url.as_str(),
                "headers": diagnostics,
            })
        }
    }
}

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use edge_gateway::config::load_config;
use edge_gateway::http::HyperTransport;
use edge_gateway::routing::Route;
use edge_gateway::Gateway;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Offline inspection tool for edge-gateway configurations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration and print the effective route table
    Check {
        config: PathBuf,
    },
    /// Show which route serves a path and where it is forwarded
    Route {
        config: PathBuf,
        path: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<Value, String> {
    match command {
        Commands::Check { config } => {
            let gateway = build(&config)?;
            let routes: Vec<Value> = gateway
                .routes()
                .in_match_order()
                .map(|route| describe(route))
                .collect();
            Ok(json!({
                "valid": true,
                "filters": gateway.filters().names(),
                "routes": routes,
            }))
        }
        Commands::Route { config, path } => {
            let gateway = build(&config)?;
            let route = gateway
                .routes()
                .match_path(&path)
                .ok_or_else(|| format!("no route matches {}", path))?;
            Ok(json!({
                "path": path,
                "route": describe(route),
                "downstream_path": route.downstream_path(&path),
            }))
        }
    }
}

fn build(path: &Path) -> Result<Gateway, String> {
    let config = load_config(path).map_err(|e| e.to_string())?;
    let transport = Arc::new(HyperTransport::new(config.listener.max_body_size));
    Gateway::from_config(config, transport).map_err(|e| e.to_string())
}

fn describe(route: &Route) -> Value {
    json!({
        "id": route.id,
        "path": route.pattern.as_str(),
        "target": route.target.to_string(),
        "rewrite": route.rewrite.is_some(),
        "policies": route.policies,
        "fallback": route.fallback,
        "require_auth": route.require_auth,
        "required_role": route.required_role,
    })
}

//! Dynaq CLI - producer and registry administration for Dynaq workers
//!
//! Specifiers may use shell-safe escapes: `.star.` for `*`, `.at.` for `@`
//! and `.not.` for `!`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9633";

#[derive(Parser)]
#[command(name = "dynaq")]
#[command(about = "Dynaq dynamic queue CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "DYNAQ_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Push a job onto a queue
    Push {
        /// Queue name
        queue: String,

        /// Payload as JSON string
        #[arg(long, default_value = "null")]
        payload: String,
    },

    /// List real queues with pending job counts
    Queues,

    /// Inspect or edit the dynamic queue registry
    #[command(subcommand)]
    Dynamic(DynamicCommands),

    /// Preview expansion weights and a poll order
    Expand {
        /// Specifiers to expand (defaults to the worker's own entry)
        specifiers: Vec<String>,

        /// Expand the entry stored under this key instead
        #[arg(short, long, conflicts_with = "specifiers")]
        key: Option<String>,

        /// Poll in declaration order instead of by weight
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand)]
enum DynamicCommands {
    /// Show the specifiers for a key (worker hostname if omitted)
    Get { key: Option<String> },

    /// Store specifiers for a key; no specifiers removes the key
    Set {
        key: String,
        specifiers: Vec<String>,
    },

    /// Replace the whole registry from a JSON object of key -> specifier list
    Replace {
        /// JSON text, or @path to read it from a file
        mapping: String,
    },

    /// Show every registry entry
    List,
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize, Tabled)]
struct PushResult {
    job_id: String,
    queue: String,
    enqueued_at: i64,
}

#[derive(Deserialize, Tabled)]
struct QueueRow {
    name: String,
    pending: i64,
}

#[derive(Tabled)]
struct RegistryRow {
    key: String,
    specifiers: String,
}

#[derive(Tabled)]
struct WeightRow {
    queue: String,
    weight: u64,
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to worker")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

/// Parse a replace-all mapping given inline or as `@path`
fn parse_mapping(arg: &str) -> Result<BTreeMap<String, Vec<String>>> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mapping file {}", path))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&text).context("Mapping must be a JSON object of key -> [specifiers]")
}

fn string_list(value: &serde_json::Value) -> Vec<String> {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Push { queue, payload } => {
            let payload_json: serde_json::Value =
                serde_json::from_str(&payload).context("Invalid JSON payload")?;

            let params = json!({ "queue": queue, "payload": payload_json });
            let result = call_rpc(&cli.rpc_url, "queue.push.v1", params).await?;
            let pushed: PushResult = serde_json::from_value(result)?;

            println!("{}", "✓ Job pushed".green().bold());
            println!();
            println!("{}", Table::new(vec![pushed]));
        }

        Commands::Queues => {
            let result = call_rpc(&cli.rpc_url, "queue.list.v1", json!({})).await?;
            let queues: Vec<QueueRow> = serde_json::from_value(result["queues"].clone())?;

            if queues.is_empty() {
                println!("{}", "No queues yet".yellow());
            } else {
                println!("{}", Table::new(queues));
            }
        }

        Commands::Dynamic(DynamicCommands::Get { key }) => {
            let result = call_rpc(&cli.rpc_url, "dynamic.get.v1", json!({ "key": key })).await?;
            println!(
                "{} {}",
                format!("{}:", result["key"].as_str().unwrap_or_default()).cyan().bold(),
                string_list(&result["specifiers"]).join(", ")
            );
        }

        Commands::Dynamic(DynamicCommands::Set { key, specifiers }) => {
            let params = json!({ "key": key, "specifiers": specifiers });
            let result = call_rpc(&cli.rpc_url, "dynamic.set.v1", params).await?;

            if result["removed"].as_bool().unwrap_or(false) {
                println!("{}", format!("✓ Removed {}", key).green().bold());
            } else {
                println!(
                    "{} {}",
                    format!("✓ {} =", key).green().bold(),
                    string_list(&result["specifiers"]).join(", ")
                );
            }
        }

        Commands::Dynamic(DynamicCommands::Replace { mapping }) => {
            let entries = parse_mapping(&mapping)?;
            let result = call_rpc(
                &cli.rpc_url,
                "dynamic.replace_all.v1",
                json!({ "entries": entries }),
            )
            .await?;
            println!(
                "{}",
                format!("✓ Registry replaced ({} keys)", result["keys_written"])
                    .green()
                    .bold()
            );
        }

        Commands::Dynamic(DynamicCommands::List) => {
            let result = call_rpc(&cli.rpc_url, "dynamic.list.v1", json!({})).await?;
            let entries: BTreeMap<String, Vec<String>> =
                serde_json::from_value(result["entries"].clone())?;
            let rows: Vec<RegistryRow> = entries
                .into_iter()
                .map(|(key, specifiers)| RegistryRow {
                    key,
                    specifiers: specifiers.join(", "),
                })
                .collect();
            println!("{}", Table::new(rows));
        }

        Commands::Expand {
            specifiers,
            key,
            strict,
        } => {
            let params = json!({ "specifiers": specifiers, "key": key, "strict": strict });
            let result = call_rpc(&cli.rpc_url, "queue.expand.v1", params).await?;

            let weights: Vec<(String, u64)> = result["weights"]
                .as_object()
                .map(|obj| {
                    obj.iter()
                        .map(|(name, w)| (name.clone(), w.as_u64().unwrap_or(0)))
                        .collect()
                })
                .unwrap_or_default();

            println!(
                "{} {}",
                "Specifiers:".bold(),
                string_list(&result["specifiers"]).join(", ")
            );
            if weights.is_empty() {
                println!("{}", "No matching queues, the worker polls 'default'".yellow());
            } else {
                let rows: Vec<WeightRow> = weights
                    .into_iter()
                    .map(|(queue, weight)| WeightRow { queue, weight })
                    .collect();
                println!("{}", Table::new(rows));
            }
            println!(
                "{} {}",
                "Poll order:".bold(),
                string_list(&result["poll_order"]).join(" ")
            );
        }
    }

    Ok(())
}

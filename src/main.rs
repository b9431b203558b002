use coordinator_exec::config::DriverConfig;
use coordinator_exec::execution::RequestEngine;
use coordinator_exec::simulation::{when, PrimedResult, SimulatedCluster};
use coordinator_exec::statement::{Consistency, Statement};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coordinator-exec")]
#[command(about = "Run statements through the request execution engine against a simulated cluster")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one statement and print its execution info as JSON
    Run {
        /// Query text
        #[arg(short, long)]
        query: String,

        /// Number of simulated nodes
        #[arg(short, long, default_value_t = 3)]
        nodes: usize,

        /// Prime a node, as NODE=RESULT (e.g. 0=unavailable:ONE:1:0, 1=invalid:Mock error message)
        #[arg(short, long)]
        prime: Vec<String>,

        /// Delay applied to every primed answer, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Path to a JSON driver config
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Mark the statement idempotent
        #[arg(long)]
        idempotent: bool,

        #[arg(long)]
        consistency: Option<String>,

        /// Request server-side tracing
        #[arg(long)]
        tracing: bool,

        /// Stop these nodes before executing (they refuse connections)
        #[arg(long)]
        stop: Vec<usize>,
    },
    /// Print the effective driver config
    ShowConfig {
        /// Path to a JSON driver config
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Run {
            query,
            nodes,
            prime,
            delay_ms,
            config,
            idempotent,
            consistency,
            tracing,
            stop,
        } => {
            let config = load_config(config)?;
            let mut statement = Statement::new(query).with_tracing(tracing);
            if idempotent {
                statement = statement.with_idempotence(true);
            }
            if let Some(consistency) = consistency {
                statement = statement.with_consistency(consistency.parse::<Consistency>()?);
            }
            run(config, statement, nodes, &prime, delay_ms, &stop).await
        }
        Commands::ShowConfig { config } => {
            let config = load_config(config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<DriverConfig> {
    let config = match path {
        Some(path) => DriverConfig::load(&path).with_context(|| format!("loading config {:?}", path))?,
        None => DriverConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

/// Parse `NODE=RESULT`.
fn parse_prime(spec: &str) -> Result<(usize, PrimedResult)> {
    let (node, result) = spec
        .split_once('=')
        .ok_or_else(|| anyhow!("prime '{}' must look like NODE=RESULT", spec))?;
    let node = node
        .trim()
        .parse()
        .with_context(|| format!("prime '{}': node must be an index", spec))?;
    Ok((node, result.parse()?))
}

async fn run(
    config: DriverConfig,
    statement: Statement,
    nodes: usize,
    primes: &[String],
    delay_ms: Option<u64>,
    stop: &[usize],
) -> Result<()> {
    let cluster = Arc::new(SimulatedCluster::new(nodes));
    for spec in primes {
        let (index, result) = parse_prime(spec)?;
        let node = cluster
            .node(index)
            .ok_or_else(|| anyhow!("prime '{}': cluster has only {} node(s)", spec, nodes))?;
        let mut prime = when(statement.query.clone()).then(result);
        if let Some(delay) = delay_ms {
            prime = prime.with_delay(std::time::Duration::from_millis(delay));
        }
        node.prime(prime);
    }
    for index in stop {
        cluster.stop_node(*index);
    }

    let engine = RequestEngine::from_config(config, cluster.clone(), cluster.clone())?;
    info!("Executing '{}' on {} simulated node(s)", statement.query, nodes);

    let mut output = match engine.execute(statement).await {
        Ok(result) => json!({
            "outcome": "success",
            "rows": result.rows(),
            "execution_info": result.execution_info(),
        }),
        Err(err) => {
            error!("Execution failed: {}", err);
            let info = match err.execution_info() {
                Some(info) => serde_json::to_value(info)?,
                None => return Err(err.into()),
            };
            json!({
                "outcome": "error",
                "kind": err.kind(),
                "error": err.to_string(),
                "execution_info": info,
            })
        }
    };

    let metrics: serde_json::Map<String, serde_json::Value> = cluster
        .nodes()
        .iter()
        .filter_map(|simulated| {
            let node = simulated.node();
            engine
                .metrics()
                .node(&node.id)
                .and_then(|m| serde_json::to_value(m).ok())
                .map(|m| (node.to_string(), m))
        })
        .collect();

    output["metrics"] = serde_json::Value::Object(metrics);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

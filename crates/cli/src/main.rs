mod config;
mod error;

use std::path::PathBuf;

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use runtime::bridge::BridgePool;
use runtime::{OrchestrationRequest, Orchestrator, Outcome, ToolCallRecord};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "switchboard.toml";

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(about = "Route chat messages to the right tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one message using the configured tool providers
    Ask {
        /// The message to answer
        #[arg(required = true)]
        message: Vec<String>,
        /// Extra instructions for planning and execution
        #[arg(short, long)]
        instructions: Option<String>,
        /// Print every tool call made while answering
        #[arg(long)]
        show_tools: bool,
    },
    /// List the tools each provider offers
    Tools,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;
    debug!(path = %cli.config.display(), "configuration loaded");

    match cli.command {
        Commands::Ask {
            message,
            instructions,
            show_tools,
        } => cmd_ask(config, message.join(" "), instructions, show_tools).await,
        Commands::Tools => cmd_tools(config).await,
    }
}

async fn cmd_ask(
    config: Config,
    message: String,
    instructions: Option<String>,
    show_tools: bool,
) -> Result<()> {
    if message.trim().is_empty() {
        return Err(Error::EmptyMessage);
    }

    let orchestrator = Orchestrator::new(config.backend()?)
        .with_config(config.engine)
        .with_policy(config.policy.clone())
        .track_tool_calls(show_tools);

    let pool = BridgePool::new(config.bridge);
    let (categories, unavailable) = pool.categories().await;
    for e in &unavailable {
        warn!(provider = e.provider(), "skipping provider: {e}");
    }

    let mut request = OrchestrationRequest::new(message).with_categories(categories);
    request.custom_instructions = instructions;

    let result = orchestrator.handle(&request).await;
    pool.shutdown().await;

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            println!("{}", e.apology());
            return Err(e.into());
        }
    };

    if show_tools {
        if let Some(plan) = &result.plan
            && !plan.is_empty()
        {
            println!("Plan:\n{}", plan.format());
        }
        for record in result.tool_calls.iter().flatten() {
            print_record(record);
        }
        if result.outcome == Outcome::Direct {
            println!("(answered without tools)");
        }
        println!();
    }

    println!("{}", result.content);
    debug!(
        run_id = %result.run_id,
        input_tokens = result.usage.input_tokens,
        output_tokens = result.usage.output_tokens,
        "done"
    );
    Ok(())
}

async fn cmd_tools(config: Config) -> Result<()> {
    let pool = BridgePool::new(config.bridge);
    let (categories, unavailable) = pool.categories().await;

    if categories.is_empty() && unavailable.is_empty() {
        println!("No tool providers configured.");
    }

    for category in &categories {
        println!("{} ({} tools)", category.key, category.tools.len());
        for tool in &category.tools {
            let descriptor = tool.describe();
            println!(
                "  {:<32}  {:<6}  {}",
                descriptor.name, descriptor.side_effect, descriptor.description
            );
        }
    }
    for e in &unavailable {
        println!("{} (unavailable: {e})", e.provider());
    }

    pool.shutdown().await;
    Ok(())
}

fn print_record(record: &ToolCallRecord) {
    let time = Local
        .from_utc_datetime(&record.started_at.naive_utc())
        .format("%H:%M:%S");
    println!("[{time}] TOOL CALL: {} {}", record.name, record.args);

    let result = record.result.as_deref().unwrap_or("(no text result)");
    let display = match result.char_indices().nth(200) {
        Some((cut, _)) => format!("{}...", &result[..cut]),
        None => result.to_string(),
    };
    println!("[{time}] TOOL RESULT: {display}");
}

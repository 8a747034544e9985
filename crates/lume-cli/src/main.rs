//! Lume CLI
//!
//! Command-line interface for service detection and structured intent extraction.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use lume_core::config::{Config, SegmenterKind};
use lume_core::detect::ServiceDetector;
use lume_core::extract::prompt::action_parameters;
use lume_core::extract::IntentExtractor;
use lume_core::generate::create_text_generator;
use lume_core::models::{Parameters, Service};

#[derive(Parser)]
#[command(name = "lume")]
#[command(about = "Lume - Detect productivity services and extract structured intents from requests")]
#[command(long_about = "Lume classifies natural language productivity requests.

Service detection is keyword based and works offline. Structured extraction sends the
request to the configured text generator (Gemini by default) and always returns a
{service, action, parameters, confidence} record.

OUTPUT FORMAT:
  All commands output JSON by default.
  Add --human for direct terminal reading.

EXAMPLES:
  lume detect \"Create a task and schedule a meeting\"
  lume detect \"email bob and book a room\" --dependency
  GEMINI_API_KEY=... lume extract \"Schedule a standup Monday at 9\" --context timezone=UTC
  lume services --human")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in human-readable format instead of JSON. Applies to all subcommands.
    #[arg(long, global = true)]
    human: bool,

    /// Config file to use instead of ~/.config/lume/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect which services a request mentions.
    /// Returns JSON with: text, services {mail, calendar, tasks, notes}, detected, segmenter.
    Detect {
        /// Request text
        text: String,

        /// Split clauses only where a conjunction joins two verb phrases
        #[arg(long)]
        dependency: bool,
    },
    /// Extract one structured intent using the configured text generator.
    /// Returns JSON with: service, action, parameters, confidence.
    Extract {
        /// Request text
        text: String,

        /// Context entries passed to the generator (repeatable). Values are parsed as JSON when possible.
        #[arg(long = "context", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        context: Vec<(String, String)>,
    },
    /// List services with their actions and detection keywords.
    Services,
    /// Show or create the configuration file.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    if key.trim().is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{}'", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let human = cli.human;
    let config_path = cli.config.unwrap_or_else(Config::default_path);

    match cli.command {
        Commands::Detect { text, dependency } => {
            let config = load_config(&config_path)?;
            handle_detect(&config, &text, dependency, human)
        }
        Commands::Extract { text, context } => {
            let config = load_config(&config_path)?;
            handle_extract(&config, &text, context, human).await
        }
        Commands::Services => {
            let config = load_config(&config_path)?;
            handle_services(&config, human)
        }
        Commands::Config { command } => handle_config_command(command, &config_path),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_from(path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;
    init_logging(&config);
    Ok(config)
}

/// Log to stderr so stdout stays machine-readable
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.general.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

// ============================================================================
// Command Handlers
// ============================================================================

fn handle_detect(config: &Config, text: &str, dependency: bool, human: bool) -> Result<()> {
    let detector = ServiceDetector::from_config(&config.detector)?;
    let kind = if dependency {
        SegmenterKind::Dependency
    } else {
        detector.default_segmenter()
    };
    let services = detector.detect_with(text, kind);

    if human {
        println!("Request: {}", text);
        println!("Segmenter: {}", kind.as_str());
        for (service, detected) in services.iter() {
            println!(
                "  {:<16} {}",
                service.display_name(),
                if detected { "yes" } else { "no" }
            );
        }
    } else {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "text": text,
                "services": services,
                "detected": services.detected(),
                "segmenter": kind.as_str()
            }))?
        );
    }
    Ok(())
}

async fn handle_extract(
    config: &Config,
    text: &str,
    context: Vec<(String, String)>,
    human: bool,
) -> Result<()> {
    let generator = create_text_generator(&config.generator)?;
    let extractor = IntentExtractor::from_config(generator, &config.generator);

    let context: Parameters = context
        .into_iter()
        .map(|(key, value)| {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            (key, value)
        })
        .collect();
    let context = (!context.is_empty()).then_some(&context);

    let intent = extractor.extract(text, context).await;

    if human {
        println!("Service:    {}", intent.service());
        println!("Action:     {}", intent.action());
        println!("Confidence: {:.2}", intent.confidence());
        if intent.parameters().is_empty() {
            println!("Parameters: (none)");
        } else {
            println!("Parameters:");
            for (key, value) in intent.parameters() {
                match value {
                    Value::String(s) => println!("  {}: {}", key, s),
                    other => println!("  {}: {}", key, other),
                }
            }
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&intent)?);
    }
    Ok(())
}

fn handle_services(config: &Config, human: bool) -> Result<()> {
    let detector = ServiceDetector::from_config(&config.detector)?;
    let table = detector.table();

    if human {
        for service in Service::ALL {
            println!("{} ({})", service.display_name(), service.as_str());
            for action in service.actions() {
                println!("  {:<18} {}", action, action_parameters(action).join(", "));
            }
            println!("  keywords: {}", table.keywords(service).join(", "));
            println!();
        }
    } else {
        let services: Vec<Value> = Service::ALL
            .iter()
            .map(|service| {
                serde_json::json!({
                    "name": service.as_str(),
                    "display_name": service.display_name(),
                    "actions": service.actions(),
                    "keywords": table.keywords(*service)
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&services)?);
    }
    Ok(())
}

fn handle_config_command(command: ConfigCommands, path: &Path) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = Config::load_from(path)?;
            print!("{}", config.to_toml()?);
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {:?} (use --force to overwrite)",
                    path
                );
            }
            Config::default().save_to(path)?;
            println!("Wrote default configuration to {:?}", path);
        }
    }
    Ok(())
}

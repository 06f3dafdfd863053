// crates/relaycli/src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use relayruntime::{Environment, Registry, RuntimeConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Relay action runtime CLI", long_about = None)]
struct Cli {
    /// Runtime configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding provider requirement configuration
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered providers and their action groups
    Providers {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run an action once and print its output
    Run {
        #[arg(short, long)]
        provider: String,

        #[arg(short, long)]
        group: String,

        #[arg(short, long)]
        action: String,

        /// Input as JSON string
        #[arg(short, long, default_value = "null")]
        input: String,
    },

    /// Start a trigger and print its events until Ctrl-C
    Watch {
        #[arg(short, long)]
        provider: String,

        #[arg(short, long)]
        group: String,

        #[arg(short, long)]
        action: String,

        /// Input as JSON string
        #[arg(short, long, default_value = "null")]
        input: String,

        /// Stop after this many events
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Write a default runtime configuration file
    Init {
        #[arg(short, long, default_value = "relay.json")]
        output: PathBuf,
    },
}

fn load_config(cli: &Cli) -> Result<RuntimeConfig> {
    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::from_file(path)?,
        None => RuntimeConfig::default(),
    };
    if let Some(dir) = &cli.config_dir {
        config.config_dir = Some(dir.clone());
    }
    if cli.verbose {
        config.log_filter = "debug".to_string();
    }
    Ok(config)
}

async fn build_registry(env: &Environment) -> Result<Arc<Registry>> {
    let mut registry = Registry::new();
    relayproviders::register_all(&mut registry)?;

    registry
        .load_provider_configs(env.config_store().as_ref())
        .await
        .context("failed to load provider configuration")?;
    Ok(Arc::new(registry))
}

fn parse_input(input: &str) -> Result<serde_json::Value> {
    serde_json::from_str(input).context("Input must be valid JSON")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { output } = &cli.command {
        return create_config(output);
    }

    let env = Environment::new(load_config(&cli)?);
    let registry = build_registry(&env).await?;

    match cli.command {
        Commands::Providers { json } => list_providers(&registry, json)?,
        Commands::Run {
            provider,
            group,
            action,
            input,
        } => run_action(&env, &registry, &provider, &group, &action, &input).await?,
        Commands::Watch {
            provider,
            group,
            action,
            input,
            limit,
        } => watch_trigger(&env, &registry, &provider, &group, &action, &input, limit).await?,
        Commands::Init { .. } => {}
    }

    Ok(())
}

fn list_providers(registry: &Registry, json: bool) -> Result<()> {
    let mut providers = registry.provider_summaries();
    providers.sort_by(|a, b| a.name.cmp(&b.name));
    let mut groups = registry.action_groups();
    groups.sort_by(|a, b| (&a.provider, &a.name).cmp(&(&b.provider, &b.name)));

    if json {
        let listing = serde_json::json!({ "providers": providers, "action_groups": groups });
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("📦 Available Providers:");
    for provider in &providers {
        let status = if provider.available { "available" } else { "unavailable" };
        println!();
        println!("  • {} ({})", provider.name, status);
        if !provider.description.is_empty() {
            println!("    {}", provider.description);
        }
        for group in groups.iter().filter(|g| g.provider == provider.name) {
            println!("    {}/", group.name);
            for action in &group.actions {
                let kind = if action.is_trigger { "trigger" } else { "action" };
                println!("      {} [{}] {}", action.name, kind, action.description);
            }
        }
    }
    Ok(())
}

async fn run_action(
    env: &Environment,
    registry: &Registry,
    provider: &str,
    group: &str,
    action: &str,
    input: &str,
) -> Result<()> {
    let binding = registry.get_action(provider, group, action)?;
    let input = parse_input(input)?;
    let ctx = env.context();
    println!("🚀 Running {} ({})", binding.qualified_name(), ctx.invocation_id);

    let output = tokio::select! {
        output = binding.run(input, ctx.clone()) => output?,
        _ = tokio::signal::ctrl_c() => {
            env.shutdown();
            anyhow::bail!("Interrupted");
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn watch_trigger(
    env: &Environment,
    registry: &Registry,
    provider: &str,
    group: &str,
    action: &str,
    input: &str,
    limit: Option<usize>,
) -> Result<()> {
    let binding = registry.get_action(provider, group, action)?;
    let input = parse_input(input)?;
    let ctx = env.context();
    let mut events = binding.start(input, ctx).await?;
    println!("👀 Watching {} (Ctrl-C to stop)", binding.qualified_name());

    let mut seen = 0;
    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(Ok(event)) => {
                    println!("{}", serde_json::to_string(&event)?);
                    seen += 1;
                    if limit.is_some_and(|limit| seen >= limit) {
                        env.shutdown();
                        break;
                    }
                }
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                env.shutdown();
                break;
            }
        }
    }

    println!("✨ Received {} events", seen);
    Ok(())
}

fn create_config(output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&RuntimeConfig::default())?;
    std::fs::write(output, json)?;

    println!("✨ Created runtime config: {}", output.display());
    println!();
    println!("Run an action with:");
    println!(
        "  relay --config {} run -p time -g timers -a delay -i '{{\"delay_ms\": 100}}'",
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaycore::MemoryConfigStore;
    use serde_json::json;

    #[tokio::test]
    async fn startup_aborts_on_bad_provider_config() {
        let store = MemoryConfigStore::new().with("web", "defaults", json!({ "timeout_ms": "soon" }));
        let env = Environment::with_store(RuntimeConfig::default(), Arc::new(store));

        let err = build_registry(&env).await.unwrap_err();
        assert!(err.to_string().contains("failed to load provider configuration"));
    }

    #[tokio::test]
    async fn startup_loads_defaults() {
        let env = Environment::with_store(RuntimeConfig::default(), Arc::new(MemoryConfigStore::new()));

        let registry = build_registry(&env).await.unwrap();
        assert!(registry.provider_summaries().iter().all(|p| p.available));
    }
}

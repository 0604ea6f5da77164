use anyhow::{Context, Result};
use mudcq::SchedulerConfig;
use mudcq::cli::{Args, Commands, ConfigDiscovery, SimulationScript};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Commands::Simulate {
            ref script,
            step_ms,
            max_secs,
            json,
        } => {
            let config = load_config(&args)?;
            let script = SimulationScript::from_toml_file(script)
                .with_context(|| format!("Failed to load simulation script {:?}", script))?;

            info!(
                "Simulating {} submissions, {} chains, {} flushes",
                script.submit.len(),
                script.chain.len(),
                script.flush.len()
            );
            let report = script.run(
                &config,
                Duration::from_millis(step_ms),
                Duration::try_from_secs_f64(max_secs).context("--max-secs must be a non-negative number")?,
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render());
            }
            Ok(())
        }
        Commands::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            let config = load_config(&args)?;
            println!();
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Commands::InitConfig { force } => {
            let path = ConfigDiscovery::create_default_user_config(force)?;
            println!("Configuration file: {}", path.display());
            Ok(())
        }
    }
}

fn load_config(args: &Args) -> Result<SchedulerConfig> {
    match &args.config {
        Some(path) => {
            info!("Loading configuration override from: {:?}", path);
            SchedulerConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load configuration {:?}", path))
        }
        None => ConfigDiscovery::discover_config().context("Failed to discover configuration"),
    }
}

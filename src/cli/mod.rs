mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scenario::SessionConfig;

#[derive(Parser)]
#[command(name = "scenario", version, about = "Evaluate contract test scenarios")]
struct Cli {
    /// JSON session config; flags below override it
    #[arg(long = "config", global = true, env = "SCENARIO_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Network whose registry and settings are used
    #[arg(long = "network", global = true, env = "NETWORK")]
    network: Option<String>,

    /// Directory holding the `networks/` registry
    #[arg(long = "base-path", global = true, env = "SCENARIO_BASE_PATH", value_name = "PATH")]
    base_path: Option<PathBuf>,

    /// Registry directory, when it is not `<base-path>/networks`
    #[arg(long = "networks-dir", global = true, value_name = "PATH")]
    networks_dir: Option<PathBuf>,

    /// Skip chain sends and registry writes
    #[arg(long = "dry-run", global = true, env = "DRY_RUN")]
    dry_run: bool,

    /// Echo every action and log at debug level
    #[arg(short = 'v', long = "verbose", global = true, env = "VERBOSE")]
    verbose: bool,

    /// Macro definitions loaded at startup
    #[arg(long = "macros", global = true, env = "SCENARIO_MACROS", value_name = "PATH")]
    macros: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a single scenario line
    Eval { line: String },
    /// Run a scenario script, one command per line, stopping at the first error
    Run { script: PathBuf },
    /// Interactive scenario prompt
    Repl,
    /// Inspect the on-disk contract registry
    Registry {
        #[command(subcommand)]
        command: RegistryCommand,
    },
}

#[derive(Subcommand)]
enum RegistryCommand {
    /// Print the registry for the selected network
    Show {
        /// Print the ABI registry instead of the metadata tree
        #[arg(long = "abi")]
        abi: bool,
    },
}

impl Cli {
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)?,
            None => SessionConfig::default(),
        };
        if let Some(network) = &self.network {
            config.network = network.clone();
        }
        if let Some(base_path) = &self.base_path {
            config.base_path = base_path.clone();
        }
        if self.networks_dir.is_some() {
            config.networks_dir = self.networks_dir.clone();
        }
        if self.macros.is_some() {
            config.macros = self.macros.clone();
        }
        config.dry_run |= self.dry_run;
        config.verbose |= self.verbose;
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub(crate) fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.session_config()?;
    init_tracing(config.verbose);

    match cli.command {
        Command::Eval { line } => commands::cmd_eval(&config, &line),
        Command::Run { script } => commands::cmd_run(&config, &script),
        Command::Repl => commands::cmd_repl(&config),
        Command::Registry { command } => match command {
            RegistryCommand::Show { abi } => commands::cmd_registry_show(&config, abi),
        },
    }
}

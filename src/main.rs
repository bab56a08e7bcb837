//! Nexible - declarative Cisco NX-OS automation
//!
//! This is the main entry point for the Nexible CLI.

mod cli;

use anyhow::Result;
use cli::commands::CommandContext;
use cli::{Cli, Commands};
use nexible::config::{Config, LoggingConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let (config, config_error) = match Config::load(cli.config.as_ref()) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    init_logging(cli.verbosity(), &config.logging);

    if cli.verbosity() >= 2 {
        eprintln!("{}", nexible::version_info());
    }
    tracing::debug!(version = VERSION, "starting nexible");

    let ctx = CommandContext::new(&cli, config);
    if let Some(e) = config_error {
        ctx.output
            .warning(&format!("Failed to load config, using defaults: {}", e));
    }

    let result = match &cli.command {
        Commands::Vrf(args) => args.execute(&ctx).await,
        Commands::InstallConfig(args) => args.execute(&ctx).await,
        Commands::Run(args) => args.execute(&ctx).await,
        Commands::ListModules => ctx.list_modules(),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            ctx.output.error(&e.to_string());
            e.downcast_ref::<nexible::error::Error>()
                .map(nexible::error::Error::exit_code)
                .unwrap_or(1)
        }
    };

    std::process::exit(exit_code);
}

/// Initialize logging based on verbosity level
///
/// `RUST_LOG` wins, then the configured level, then `-v` flags.
fn init_logging(verbosity: u8, logging: &LoggingConfig) {
    let filter = match verbosity {
        0 => logging.log_level.as_deref().unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(verbosity >= 3)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

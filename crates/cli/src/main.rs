//! Parsec CLI: the main entry point.
//!
//! Commands:
//! - `serve`         : Start the HTTP gateway
//! - `test-provider` : Send one message through a provider adapter
//! - `tools`         : Print the tool definitions sent to models
//! - `providers`     : List implemented providers
//! - `config`        : Show the effective configuration, its path, or write defaults

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "parsec",
    about = "Parsec: ask an AI agent about your database, codebase and logs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check a provider's credentials with a one-line request
    TestProvider {
        /// Provider identifier (anthropic, openai, mistral, google)
        provider: String,

        /// API key for the provider
        api_key: String,

        /// Model to use (defaults to the provider's default model)
        model: Option<String>,
    },

    /// Print the tool definitions as JSON
    Tools,

    /// List implemented providers and their default models
    Providers,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::TestProvider {
            provider,
            api_key,
            model,
        } => commands::test_provider::run(&provider, &api_key, model.as_deref()).await?,
        Commands::Tools => commands::tools::run()?,
        Commands::Providers => commands::providers::run(),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show()?,
            ConfigAction::Path => commands::config_cmd::path(),
            ConfigAction::Init => commands::config_cmd::init()?,
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_provider_model_is_optional() {
        let cli = Cli::try_parse_from(["parsec", "test-provider", "openai", "sk-test"]).unwrap();
        match cli.command {
            Commands::TestProvider {
                provider, model, ..
            } => {
                assert_eq!(provider, "openai");
                assert!(model.is_none());
            }
            _ => panic!("expected test-provider"),
        }
    }

    #[test]
    fn serve_accepts_port() {
        let cli = Cli::try_parse_from(["parsec", "-v", "serve", "--port", "8080"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Serve { port: Some(8080) }));
    }

    #[test]
    fn config_init_parses() {
        let cli = Cli::try_parse_from(["parsec", "config", "init"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init
            }
        ));
    }
}

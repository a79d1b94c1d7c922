// CLI Interface
//
// This module provides the command-line interface for LeSuggestion.

use crate::config::{Config, DEFAULT_CONFIG_FILE, PORT_ENV_VAR};
use crate::error::{format_error, SuggestError};
use crate::mcp::{serve_stdio, McpServer, McpState};
use crate::store::{DocumentStore, SqliteStore};
use crate::suggest::LibrarySuggester;
use anyhow::Context;
use anyhow::Result as AnyhowResult;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// LeSuggestion - Documentation Library Suggester
#[derive(Parser, Debug)]
#[command(name = "lesuggestion")]
#[command(author = "LeIndex Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Suggest which indexed documentation libraries best answer a query", long_about = None)]
#[command(subcommand_required = false)]
#[command(arg_required_else_help = false)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(global = true, long = "config", short = 'c')]
    pub config: Option<PathBuf>,

    /// Path to the SQLite document store (overrides the configuration)
    #[arg(global = true, long = "db")]
    pub db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(global = true, long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Compatibility flag for some AI tools (defaults to MCP stdio mode)
    #[arg(long = "stdio")]
    pub stdio: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank indexed libraries for a query
    Suggest {
        /// Search query
        #[arg(value_name = "QUERY")]
        query: String,

        /// Maximum number of libraries to return (1-20)
        #[arg(long = "max-results", short = 'n')]
        max_results: Option<usize>,

        /// Print the result as JSON
        #[arg(long = "json")]
        json: bool,
    },

    /// List indexed libraries and their versions
    Libraries {
        /// Print the listing as JSON
        #[arg(long = "json")]
        json: bool,
    },

    /// Start MCP server for AI assistant integration
    Serve {
        /// Host address to bind to
        #[arg(long = "host")]
        host: Option<String>,

        /// Port to listen on (default: 47269, override with LESUGGESTION_PORT env var)
        #[arg(long = "port")]
        port: Option<u16>,
    },

    /// Run MCP server in stdio mode (for AI tool subprocess integration)
    Mcp {
        /// Compatibility flag for some AI tools
        #[arg(long = "stdio")]
        stdio: bool,
    },
}

impl Cli {
    /// Run the CLI
    pub async fn run(self) -> AnyhowResult<()> {
        init_logging_impl(self.verbose);

        let config = load_config(self.config.as_deref())?;
        let db_path = self.db.unwrap_or_else(|| config.store.db_path.clone());

        // Default to Mcp if no command is provided or if --stdio is set
        let command = if self.stdio {
            Commands::Mcp { stdio: true }
        } else {
            self.command.unwrap_or(Commands::Mcp { stdio: false })
        };

        match command {
            Commands::Suggest {
                query,
                max_results,
                json,
            } => cmd_suggest_impl(&config, &db_path, query, max_results, json).await,
            Commands::Libraries { json } => cmd_libraries_impl(&config, &db_path, json).await,
            Commands::Serve { host, port } => cmd_serve_impl(&config, &db_path, host, port).await,
            Commands::Mcp { .. } => cmd_mcp_stdio_impl(&config, &db_path).await,
        }
    }
}

/// Initialize logging implementation
///
/// Logs go to stderr; stdout carries command output and stdio JSON-RPC.
fn init_logging_impl(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Locate the configuration file
///
/// An explicit path wins, then the working directory's
/// [`DEFAULT_CONFIG_FILE`], then the user config directory.
fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("lesuggestion").join("config.toml"))
        .filter(|path| path.exists())
}

fn load_config(explicit: Option<&Path>) -> AnyhowResult<Config> {
    match resolve_config_path(explicit) {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            Config::load(Some(&path))
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

/// Open the SQLite store and build a suggester from configuration
fn open_suggester(config: &Config, db_path: &Path) -> AnyhowResult<LibrarySuggester> {
    let store = SqliteStore::open(db_path)
        .with_context(|| format!("Failed to open document store at {}", db_path.display()))?;
    let store: Arc<dyn DocumentStore> = Arc::new(store);
    Ok(LibrarySuggester::from_config(store, &config.suggest))
}

/// Suggest command implementation
async fn cmd_suggest_impl(
    config: &Config,
    db_path: &Path,
    query: String,
    max_results: Option<usize>,
    json: bool,
) -> AnyhowResult<()> {
    let suggester = open_suggester(config, db_path)?;

    info!("Suggesting libraries for: {}", query);

    let result = match suggester.suggest(&query, max_results).await {
        Ok(result) => result,
        Err(e @ SuggestError::InvalidArgument { .. }) => {
            anyhow::bail!("{}", format_error(&e));
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Suggestion failed")),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.is_empty() {
        println!("No matching libraries for: {}", query);
        return Ok(());
    }

    println!("\n{} matching libraries for: '{}'\n", result.len(), query);
    for (i, library) in result.libraries.iter().enumerate() {
        println!("{}. {} (score: {:.3})", i + 1, library.name, library.score);
        if let Some(content) = &library.matched_content {
            println!("   {}", content.replace('\n', " "));
        }
        println!();
    }

    Ok(())
}

/// Libraries command implementation
async fn cmd_libraries_impl(config: &Config, db_path: &Path, json: bool) -> AnyhowResult<()> {
    let suggester = open_suggester(config, db_path)?;
    let libraries = suggester
        .store()
        .list_libraries()
        .await
        .context("Failed to list libraries")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&libraries)?);
        return Ok(());
    }

    if libraries.is_empty() {
        println!("No libraries indexed in {}", db_path.display());
        return Ok(());
    }

    for library in &libraries {
        println!("{}", library.library);
        for version in &library.versions {
            let label = if version.version.is_empty() {
                "(unversioned)"
            } else {
                version.version.as_str()
            };
            println!("  {} - {} document(s)", label, version.document_count);
        }
    }

    Ok(())
}

/// Serve command implementation - Start MCP server
async fn cmd_serve_impl(
    config: &Config,
    db_path: &Path,
    host: Option<String>,
    port: Option<u16>,
) -> AnyhowResult<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or_else(|| config.server.effective_port());

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid address or port")?;

    let suggester = open_suggester(config, db_path)?;
    let server = McpServer::with_address(addr, suggester);

    println!("\nLeSuggestion MCP Server\n");
    println!("Server starting on http://{}\n", addr);
    println!("Available endpoints:");
    println!("  POST /mcp            - JSON-RPC 2.0 endpoint");
    println!("  GET  /mcp/tools/list - List available tools");
    println!("  GET  /health         - Health check");
    println!("\nConfiguration:");
    println!("  Store: {}", db_path.display());
    println!("  Port: {} (override with {} env var)", port, PORT_ENV_VAR);
    println!("\nPress Ctrl+C to stop the server\n");

    server.run().await.context("Server error")?;

    Ok(())
}

/// MCP stdio command implementation - Run MCP server in stdio mode
async fn cmd_mcp_stdio_impl(config: &Config, db_path: &Path) -> AnyhowResult<()> {
    info!("Starting LeSuggestion MCP stdio server, store: {}", db_path.display());

    let suggester = open_suggester(config, db_path)?;
    let state = McpState::new(suggester);

    serve_stdio(&state).await
}

/// Main entry point for the CLI
pub async fn main() -> AnyhowResult<()> {
    let cli = Cli::parse();
    cli.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_suggest_command() {
        let cli = Cli::try_parse_from(["lesuggestion", "suggest", "react hooks"]).unwrap();
        match cli.command {
            Some(Commands::Suggest {
                query,
                max_results,
                json,
            }) => {
                assert_eq!(query, "react hooks");
                assert_eq!(max_results, None);
                assert!(!json);
            }
            _ => panic!("Expected Suggest command"),
        }
    }

    #[test]
    fn test_suggest_options() {
        let cli = Cli::try_parse_from([
            "lesuggestion",
            "suggest",
            "tokio",
            "--max-results",
            "3",
            "--json",
            "--db",
            "/tmp/docs.db",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/docs.db")));
        assert!(matches!(
            cli.command,
            Some(Commands::Suggest {
                max_results: Some(3),
                json: true,
                ..
            })
        ));
    }

    #[test]
    fn test_mcp_command_parsing() {
        let cli = Cli::try_parse_from(["lesuggestion", "mcp"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Mcp { .. })));
    }

    #[test]
    fn test_stdio_flag_parsing() {
        let cli = Cli::try_parse_from(["lesuggestion", "--stdio"]).unwrap();
        assert!(cli.stdio);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_serve_command() {
        let cli = Cli::try_parse_from(["lesuggestion", "serve", "--port", "9000"]).unwrap();
        match cli.command {
            Some(Commands::Serve { host, port }) => {
                assert_eq!(host, None);
                assert_eq!(port, Some(9000));
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_explicit_config_path_is_used() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[suggest]\ndefault_max_results = 8\n").unwrap();

        assert_eq!(resolve_config_path(Some(&path)), Some(path.clone()));
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.suggest.default_max_results, 8);
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let dir = tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }
}

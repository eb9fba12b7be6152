use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use agentmd_core::signal::strip_markdown_suffix;
use agentmd_core::{AgentMdConfig, AgentMdConfigBuilder, DefaultResolver, Resolution, build_site_index};

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Inspect how requests are classified and resolved to Markdown
#[derive(Parser, Debug)]
#[command(name = "agentmd", version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show which signal, if any, a request carries
    Detect {
        /// Request path, e.g. /pricing.md
        path: String,

        /// Accept header value
        #[arg(long, value_name = "HEADER")]
        accept: Option<String>,

        /// User-Agent header value
        #[arg(long, value_name = "UA")]
        user_agent: Option<String>,

        /// Print the signal as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a path to Markdown and print it
    Resolve {
        /// Logical path; a trailing .md is stripped
        path: String,

        /// Directory holding curated artifacts
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Origin for live fetches
        #[arg(long, value_name = "URL")]
        origin: Option<String>,

        /// Cookie header forwarded to the origin
        #[arg(long, value_name = "COOKIE")]
        cookie: Option<String>,

        /// Print the body and cache policy as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the llms.txt index of curated artifacts
    Index {
        /// Directory holding curated artifacts
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Index heading
        #[arg(long)]
        title: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Write the index as JSON instead of Markdown
        #[arg(long)]
        json: bool,
    },

    /// Generate a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "agentmd=debug" } else { "agentmd=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AgentMdConfig> {
    match path {
        Some(path) => AgentMdConfig::load(path).with_context(|| format!("Failed to load config: {}", path.display())),
        None => AgentMdConfig::load_or_default().context("Failed to load default config"),
    }
}

fn with_root(config: AgentMdConfig, root: Option<PathBuf>) -> AgentMdConfig {
    match root {
        Some(root) => AgentMdConfigBuilder::from_config(config).content_root(root).build(),
        None => config,
    }
}

fn detect(
    config: &AgentMdConfig, path: &str, accept: Option<&str>, user_agent: Option<&str>, json: bool,
) -> anyhow::Result<ExitCode> {
    let detector = config.detector().context("Invalid detection settings")?;
    let signal = detector.classify(path, accept, user_agent);

    if json {
        println!("{}", serde_json::to_string(&signal)?);
        return Ok(ExitCode::SUCCESS);
    }

    match signal {
        Some(signal) => {
            println!("{}", signal.header_value());
            echo::print_info(&format!("Resolves {}", signal.logical_path(path)));
        }
        None if detector.is_excluded(path) => {
            println!("none");
            echo::print_warning("Path is excluded from classification");
        }
        None => println!("none"),
    }
    Ok(ExitCode::SUCCESS)
}

async fn resolve(
    config: &AgentMdConfig, path: &str, cookie: Option<&str>, json: bool, verbose: bool,
) -> anyhow::Result<ExitCode> {
    let resolver = DefaultResolver::from_config(config).context("Failed to build resolver")?;
    let logical = strip_markdown_suffix(path).unwrap_or_else(|| path.to_string());
    let (resolution, trace) = resolver.resolve_traced(&logical, cookie).await;

    if verbose {
        echo::print_trace(&trace);
    }

    match resolution {
        Resolution::Found(content) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&content)?);
            } else {
                print!("{}", content.body);
            }
            echo::print_success(&format!(
                "{} ({}, cache: {})",
                logical,
                echo::format_size(content.body.len()),
                echo::cache_label(content.cache_policy)
            ));
            Ok(ExitCode::SUCCESS)
        }
        Resolution::NotFound => {
            echo::print_error(&format!("No Markdown for {logical}"));
            Ok(ExitCode::from(1))
        }
        Resolution::InvalidInput => {
            echo::print_error(&format!("Invalid path: {path}"));
            Ok(ExitCode::from(2))
        }
    }
}

fn index(
    config: &AgentMdConfig, title: Option<String>, output: Option<PathBuf>, json: bool,
) -> anyhow::Result<ExitCode> {
    let title = title
        .or_else(|| config.site_title.clone())
        .unwrap_or_else(|| "Site index".to_string());
    let index = build_site_index(&config.content_root, &config.artifact_name, &title)
        .with_context(|| format!("Failed to index {}", config.content_root.display()))?;
    let text = if json { format!("{}\n", serde_json::to_string_pretty(&index)?) } else { index.render() };

    match output {
        Some(path) => {
            fs::write(&path, &text).with_context(|| format!("Failed to write output file: {}", path.display()))?;
            echo::print_success(&format!("Indexed {} pages into {}", index.entries.len(), path.display()));
        }
        None => print!("{text}"),
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    if let Command::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "agentmd", &mut io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    init_logging(cli.verbose);
    if cli.verbose {
        echo::print_banner();
    }

    let config = load_config(cli.config.as_ref())?;
    if cli.verbose {
        eprintln!("  {} {}\n", "Content root:".dimmed(), config.content_root.display().bright_white());
    }

    match cli.command {
        Command::Detect { path, accept, user_agent, json } => {
            detect(&config, &path, accept.as_deref(), user_agent.as_deref(), json)
        }
        Command::Resolve { path, root, origin, cookie, json } => {
            let mut config = with_root(config, root);
            if origin.is_some() {
                config.origin = origin;
            }
            resolve(&config, &path, cookie.as_deref(), json, cli.verbose).await
        }
        Command::Index { root, title, output, json } => index(&with_root(config, root), title, output, json),
        Command::Completions { .. } => Ok(ExitCode::SUCCESS),
    }
}

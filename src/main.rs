use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use personaweave::Topology;

/// Parse dispatch topology from string
fn parse_topology(s: &str) -> Result<Topology, String> {
    s.parse()
}

#[derive(Parser)]
#[command(name = "personaweave")]
#[command(
    version,
    about = "Multi-agent pipeline that synthesizes and persists social-network profiles"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize PersonaWeave in the current directory
    Init {
        #[arg(long, short, help = "Overwrite existing configuration")]
        force: bool,
    },

    /// Execute profile pipeline runs
    Run {
        #[arg(long, short, default_value = "1", help = "Number of independent runs")]
        count: usize,
        #[arg(
            long,
            short,
            default_value = "direct",
            value_parser = parse_topology,
            help = "Dispatch topology: direct, handoff"
        )]
        topology: Topology,
        #[arg(long, help = "Generator provider (openai, ollama)")]
        provider: Option<String>,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
    },

    /// Show the persisted corpus
    Status {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Show the effective configuration (merged from all sources)
    Config {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mPersonaWeave encountered an unexpected error:\x1b[0m");
        eprintln!("  {message}");

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }

        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Init { force } => {
            personaweave::cli::init(force)?;
        }
        Commands::Run {
            count,
            topology,
            provider,
            model,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(personaweave::cli::run(personaweave::cli::RunOptions {
                count,
                topology,
                provider,
                model,
            }))?;
        }
        Commands::Status { format } => {
            personaweave::cli::status(&format)?;
        }
        Commands::Config { format } => {
            personaweave::cli::config_show(&format)?;
        }
    }

    Ok(())
}

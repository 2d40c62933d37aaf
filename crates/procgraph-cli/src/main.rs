//! Procgraph CLI
//!
//! Loads RDF files into one session and answers questions about it:
//! - SELECT / ASK queries (engine first, local evaluator as fallback)
//! - the process hierarchy and its validation errors
//! - derived subtypes and the virtual graphs that hold them
//! - N-Quads dumps of the store, derived facts included

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use procgraph_core::materialize::virtual_graphs;
use procgraph_core::{LocalEngine, QueryEngine, Session, SessionConfig, UnavailableEngine};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod render;

#[derive(Parser)]
#[command(name = "procgraph")]
#[command(author, version, about = "Procgraph: query and reason over process-tree diagrams")]
struct Cli {
    /// More logging (`-v` debug, `-vv` trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Session configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// RDF input files (.ttl, .trig, .nt, .nq, .rdf)
    #[arg(short, long = "data", global = true)]
    data: Vec<PathBuf>,

    /// Engine tried before the local evaluator
    #[arg(long, value_enum, default_value_t = EngineChoice::Local, global = true)]
    engine: EngineChoice,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineChoice {
    /// The built-in evaluator behind the engine interface
    Local,
    /// No engine; every query takes the fallback path
    Unavailable,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a SELECT query (`@file` reads it from a file, `-` from stdin)
    Query { query: String },

    /// Run an ASK query (`@file` reads it from a file, `-` from stdin)
    Ask { query: String },

    /// Print the process hierarchy, or its validation errors
    Hierarchy,

    /// Print the derived subtype of every individual in every schema graph
    Subtypes,

    /// Write the store as N-Quads
    Dump {
        /// Only the derived (virtual) graphs
        #[arg(long)]
        virtual_only: bool,
    },

    /// Print the effective configuration
    Config,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let session = open_session(cli.config.as_deref(), &cli.data)?;
    let engine: Box<dyn QueryEngine> = match cli.engine {
        EngineChoice::Local => Box::new(LocalEngine),
        EngineChoice::Unavailable => Box::new(UnavailableEngine::new("no external engine configured")),
    };

    match cli.command {
        Commands::Query { query } => {
            let query = read_query_arg(&query)?;
            let answered = session.select_with(engine.as_ref(), &query).await?;
            render::print_fallback(&answered.fallback_reason);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&answered)?);
            } else {
                let variables = procgraph_core::parse_query(&query, session.prefixes())
                    .map(|q| q.projection())
                    .unwrap_or_default();
                render::print_rows(&variables, &answered.value, &answered.source);
            }
        }
        Commands::Ask { query } => {
            let query = read_query_arg(&query)?;
            let answered = session.ask_with(engine.as_ref(), &query).await?;
            render::print_fallback(&answered.fallback_reason);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&answered)?);
            } else if answered.value {
                println!("{}", "true".green().bold());
            } else {
                println!("{}", "false".red().bold());
            }
        }
        Commands::Hierarchy => match session.hierarchy() {
            Ok(hierarchy) if cli.json => println!("{}", serde_json::to_string_pretty(hierarchy)?),
            Ok(hierarchy) => render::print_hierarchy(hierarchy, &session),
            Err(invalid) => {
                render::print_validation_errors(invalid);
                return Ok(ExitCode::FAILURE);
            }
        },
        Commands::Subtypes => {
            if let Err(invalid) = session.hierarchy() {
                render::print_validation_errors(invalid);
                return Ok(ExitCode::FAILURE);
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(session.subtypes())?);
            } else {
                render::print_subtypes(&session);
            }
        }
        Commands::Dump { virtual_only } => {
            let derived = virtual_graphs(session.store(), &session.config().vocabulary);
            let quads = session.store().iter().filter(|q| {
                !virtual_only || q.graph_id().is_some_and(|g| derived.contains(&g))
            });
            let stdout = io::stdout();
            let written = procgraph_ingest_rdf::write_nquads(stdout.lock(), quads)?;
            tracing::info!(quads = written, "dumped store");
        }
        Commands::Config => println!("{}", session.config().to_json_pretty()?),
    }
    Ok(ExitCode::SUCCESS)
}

fn open_session(config: Option<&Path>, data: &[PathBuf]) -> Result<Session> {
    let config = match config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    let mut session = Session::new(config);

    let mut quads = Vec::new();
    for path in data {
        let doc = procgraph_ingest_rdf::load_file(path)?;
        tracing::info!(path = %path.display(), quads = doc.quads.len(), "loaded RDF");
        session.add_prefixes(&doc.prefixes);
        quads.extend(doc.quads);
    }
    // One load, one recompute.
    if !quads.is_empty() {
        session.load(quads);
    }
    Ok(session)
}

fn read_query_arg(arg: &str) -> Result<String> {
    if arg == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    match arg.strip_prefix('@') {
        Some(path) if path.is_empty() => Err(anyhow!("`@` needs a file name")),
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read query file {path}")),
        None => Ok(arg.to_string()),
    }
}

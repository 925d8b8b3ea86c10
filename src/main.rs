//! Strata CLI
//!
//! Usage:
//!   strata [OPTIONS] <TEMPLATE>
//!
//! Options:
//!   -d, --dir <DIR>        Template directory (repeatable, searched in order)
//!   -c, --config <FILE>    Engine configuration file (TOML format)
//!   --context <FILE>       Variables for the render (TOML format)
//!   --var <KEY=VALUE>      Set a string variable (repeatable)
//!   --debug                Propagate include errors and report source locations
//!   --no-autoescape        Do not HTML-escape variable output
//!   -h, --help             Print help

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use strata::{Context, Engine, EngineConfig, Value};

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Render layered templates with block inheritance")]
struct Cli {
    /// Name of the template to render, relative to the template directories
    template: String,

    /// Template directory (repeatable, searched in order)
    #[arg(short, long = "dir")]
    dirs: Vec<PathBuf>,

    /// Engine configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Variables for the render (TOML format)
    #[arg(long)]
    context: Option<PathBuf>,

    /// Set a string variable, e.g. --var title=Home (repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Propagate include errors and report source locations
    #[arg(long)]
    debug: bool,

    /// Do not HTML-escape variable output
    #[arg(long)]
    no_autoescape: bool,
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();

    let cli = Cli::parse();

    // Load configuration, then apply command line overrides
    let mut config = match &cli.config {
        Some(path) => match EngineConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };
    config.dirs.extend(cli.dirs.iter().cloned());
    if config.dirs.is_empty() {
        config.dirs.push(PathBuf::from("."));
    }
    if cli.debug {
        config.debug = true;
    }
    if cli.no_autoescape {
        config.autoescape = false;
    }

    let engine = Arc::new(Engine::new(config));
    let mut ctx = Context::new(engine.clone());

    // Load variables
    if let Some(path) = &cli.context {
        let table = match fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| toml::from_str::<toml::Table>(&content).map_err(|e| e.to_string()))
        {
            Ok(table) => table,
            Err(e) => {
                eprintln!("Error reading context '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        };
        for (key, value) in table {
            ctx.set(key, Value::from(value));
        }
    }
    for (key, value) in &cli.vars {
        ctx.set(key.clone(), value.clone());
    }

    match engine.render_to_string(&cli.template, &mut ctx) {
        Ok(output) => {
            print!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

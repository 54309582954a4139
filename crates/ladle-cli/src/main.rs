#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::cast_possible_truncation)]

mod commands;
mod logging;

use clap::Parser;
use ladle_core::BuildMode;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ladle")]
#[command(author, version, about = "Discover stories and inspect the generated story list", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Config folder, relative to the project root
    #[arg(long, global = true, value_name = "DIR", default_value = ".ladle")]
    config: PathBuf,

    /// Directory holding the ladle runtime (`story-hmr`)
    #[arg(long, global = true, value_name = "DIR")]
    runtime_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List discovered stories
    List,

    /// Print the `virtual:generated-list` module
    Generate {
        /// `development` serves a fallback module on failure; `production` exits 1
        #[arg(long, default_value = "development")]
        mode: BuildMode,

        /// Write the module to a file instead of stdout
        #[arg(long, short = 'o')]
        outfile: Option<PathBuf>,
    },

    /// Print a story file with HMR instrumentation applied
    Transform {
        /// Story file, relative to the project root
        file: PathBuf,
    },

    /// Regenerate the story list whenever story files change
    Watch,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    logging::init(cli.verbose, cli.json);

    let ctx = commands::Context::load(cwd, &cli.config, cli.runtime_dir)?;
    let span = tracing::info_span!("ladle", root = %ctx.root.display());
    let _guard = span.enter();

    match cli.command {
        Commands::List => commands::list::run(&ctx, cli.json),
        Commands::Generate { mode, outfile } => {
            commands::generate::run(&ctx, mode, outfile.as_deref(), cli.json)
        }
        Commands::Transform { file } => commands::transform::run(&ctx, &file, cli.json),
        Commands::Watch => commands::watch::run(ctx, cli.json),
    }
}

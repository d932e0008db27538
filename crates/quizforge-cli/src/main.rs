//! quizforge CLI: grade contour answers and generate exam variants from
//! files on disk.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "quizforge",
    version,
    about = "Contour answer grading and exam variant generation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a graphic answer against its reference annotations
    Grade {
        /// Reference annotation set (JSON)
        #[arg(long)]
        reference: PathBuf,

        /// Submitted contours (JSON array)
        #[arg(long)]
        submission: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Write a JSON grading report to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Generate exam variants from a question bank
    Generate {
        /// Question bank (TOML)
        #[arg(long)]
        bank: PathBuf,

        /// Test definition (TOML)
        #[arg(long)]
        test: PathBuf,

        /// Number of variants to generate
        #[arg(long, default_value = "1")]
        count: usize,

        /// Seed for reproducible sampling
        #[arg(long)]
        seed: Option<u64>,

        /// Restrict the bank to questions created by this user
        #[arg(long)]
        owner: Option<u64>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Write a JSON variant report to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate config, question bank and test definition files
    Validate {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Question bank (TOML)
        #[arg(long)]
        bank: Option<PathBuf>,

        /// Test definition (TOML)
        #[arg(long)]
        test: Option<PathBuf>,
    },

    /// Create starter config, question bank and test definition
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quizforge=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            reference,
            submission,
            config,
            format,
            output,
        } => commands::grade::execute(reference, submission, config, format, output),
        Commands::Generate {
            bank,
            test,
            count,
            seed,
            owner,
            config,
            format,
            output,
        } => commands::generate::execute(bank, test, count, seed, owner, config, format, output),
        Commands::Validate { config, bank, test } => commands::validate::execute(config, bank, test),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

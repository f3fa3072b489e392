//! mathtutor CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "mathtutor",
    version,
    about = "Quiz grading, math detection and mastery tracking"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade submissions against a quiz bank
    Grade {
        /// Path to a quiz bank file (.toml or .json)
        #[arg(long)]
        quiz_bank: PathBuf,

        /// JSON file with one submission or an array of them
        #[arg(long)]
        submissions: PathBuf,

        /// Output directory (defaults to the configured output_dir)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, markdown, all
        #[arg(long, default_value = "json")]
        format: String,

        /// Fold each student's percentage into the mastery store
        #[arg(long)]
        record_mastery: bool,

        /// Max concurrent mastery updates (defaults to the configured parallelism)
        #[arg(long)]
        parallelism: Option<usize>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate quiz bank files
    Validate {
        /// Path to quiz bank file or directory
        #[arg(long)]
        quiz_bank: PathBuf,
    },

    /// Check whether text looks like a math question
    Detect {
        /// Text to classify
        text: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Convert worded math into LaTeX-like notation
    Normalize {
        /// Text to convert
        text: String,
    },

    /// Read or update mastery records
    Mastery {
        #[command(subcommand)]
        command: MasteryCommands,
    },

    /// Create starter config and example quiz bank
    Init,
}

#[derive(Subcommand)]
enum MasteryCommands {
    /// Record a score for one objective
    Update {
        #[arg(long)]
        student: String,

        #[arg(long)]
        topic: String,

        #[arg(long)]
        objective: String,

        /// Percentage score; clamped to 0-100
        #[arg(long, allow_negative_numbers = true)]
        score: f64,

        /// Curriculum country code
        #[arg(long)]
        country: Option<String>,

        /// Curriculum level code
        #[arg(long)]
        level: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show a student's mastery records
    Show {
        #[arg(long)]
        student: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mathtutor=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            quiz_bank,
            submissions,
            output,
            format,
            record_mastery,
            parallelism,
            config,
        } => {
            commands::grade::execute(commands::grade::GradeArgs {
                quiz_bank,
                submissions,
                output,
                format,
                record_mastery,
                parallelism,
                config,
            })
            .await
        }
        Commands::Validate { quiz_bank } => commands::validate::execute(quiz_bank),
        Commands::Detect { text, config } => commands::detect::execute(&text, config),
        Commands::Normalize { text } => commands::normalize::execute(&text),
        Commands::Mastery { command } => match command {
            MasteryCommands::Update {
                student,
                topic,
                objective,
                score,
                country,
                level,
                config,
            } => {
                commands::mastery::update(
                    commands::mastery::UpdateArgs {
                        student,
                        topic,
                        objective,
                        score,
                        country,
                        level,
                    },
                    config,
                )
                .await
            }
            MasteryCommands::Show { student, config } => {
                commands::mastery::show(&student, config).await
            }
        },
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "assessment-etl",
    version,
    about = "Extracts completed assessments into embedded semantic documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log output layout
    #[arg(long, value_enum, default_value_t = logging::LogFormat::Compact, global = true)]
    log_format: logging::LogFormat,

    /// Path to the YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one completed assessment
    Run {
        /// Legacy PostgreSQL connection string
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
        /// SQLite file receiving users and documents
        #[arg(long, default_value = "assessment_documents.db")]
        store: PathBuf,
        #[arg(long)]
        user_id: Uuid,
        #[arg(long)]
        test_sequence_id: i64,
        /// Job id reported to the tracker (generated when omitted)
        #[arg(long)]
        job_id: Option<String>,
    },
    /// List the query catalog
    Queries,
    /// Validate and print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level, cli.log_format)?;

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            database_url,
            store,
            user_id,
            test_sequence_id,
            job_id,
        } => {
            commands::run(config, &database_url, &store, user_id, test_sequence_id, job_id).await
        }
        Commands::Queries => commands::queries(),
        Commands::Config => commands::print_config(&config),
    }
}

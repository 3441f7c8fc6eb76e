mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::*;

#[derive(Parser)]
#[command(name = "strata-migrate")]
#[command(about = "Upgrade a database to the latest schema version")]
struct Cli {
    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how the database compares to the registered steps
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered steps and whether they are applied
    List,

    /// Apply every pending step
    Up {
        /// Stop after this step id
        #[arg(long)]
        to: Option<i64>,

        /// Output the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the CREATE TABLE statements of a table, no connection needed
    Ddl {
        /// Target dialect (h2, postgresql, oracle, mssql)
        #[arg(long)]
        dialect: String,

        /// Table name
        #[arg(long)]
        table: String,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let result = match cli.command {
        Commands::Status { json } => migrate::status(json).await,
        Commands::List => migrate::list().await,
        Commands::Up { to, json } => migrate::up(to, json).await,
        Commands::Ddl { dialect, table } => ddl::print(&dialect, &table),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

//! Command-line interface: `serve` starts the HTTP server, `migrate` runs
//! pending migrations standalone (useful in a deploy step ahead of
//! `serve`).

use clap::{Parser, Subcommand};

use crate::database::Database;
use crate::error::Result;

#[derive(Parser)]
#[command(name = "tallyline")]
#[command(version, about = "Conversational expense-tracking backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run pending database migrations and exit.
    Migrate,

    /// Start the HTTP server (webhooks, API, admin surface).
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(long, default_value = "8000")]
        port: u16,
    },
}

pub async fn run_migrate(db: &Database) -> Result<()> {
    db.migrate().await?;
    println!("migrations complete");
    Ok(())
}

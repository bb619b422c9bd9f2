use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "taskdash")]
#[command(about = "Taskdash - task dashboard operations", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database schema
    InitDb,

    /// Create a user account
    SeedUser {
        /// Login name
        #[arg(long)]
        username: String,

        /// Password (hashed before storage)
        #[arg(long)]
        password: String,

        /// Contact email
        #[arg(long)]
        email: Option<String>,

        /// Account role (admin or user)
        #[arg(long, default_value = "user")]
        role: String,
    },

    /// Render an export artifact, or push a full cycle to a destination
    Export {
        /// Artifact format: csv, json or report
        #[arg(long, default_value = "csv")]
        format: String,

        /// Run one full export cycle against a destination (s3 or drive)
        /// instead of printing to stdout
        #[arg(long)]
        destination: Option<String>,
    },
}

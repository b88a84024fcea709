//! CLI module - Command-line interface for GeneVision
//!
//! The web server is the default command; the rest are maintenance tasks
//! that open the database directly.

mod commands;

use clap::{Parser, Subcommand};

/// GeneVision - genomic annotation pipeline backend
#[derive(Parser)]
#[command(name = "genevision")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web API with the history retention job
    #[command(alias = "daemon", alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Delete activity entries past the retention window
    PruneHistory {
        /// Retention in days, defaults to the configured value
        #[arg(long)]
        days: Option<i64>,
    },

    /// Show recent activity for a user
    #[command(alias = "h")]
    History {
        /// Account email
        email: String,
        /// Number of entries to show
        #[arg(default_value = "10")]
        limit: u64,
    },

    /// Show usage statistics for a user
    Stats {
        /// Account email
        email: String,
    },

    /// List a user's sequences
    #[command(alias = "ls")]
    Sequences {
        /// Account email
        email: String,
        /// Number of sequences to show
        #[arg(default_value = "20")]
        limit: u64,
    },

    /// Set a new password without the current one
    ResetPassword {
        /// Account email
        email: String,
        /// New password
        password: String,
    },
}

pub use commands::*;

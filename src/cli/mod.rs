//! CLI command definitions for points-ledger
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Args, Parser, Subcommand};

/// Points ledger HTTP server and admin tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (default if no subcommand given)
    Serve(ServeArgs),

    /// Register a user account
    AddUser(AddUserArgs),

    /// Add a catalog task or update its title and points
    AddTask(AddTaskArgs),

    /// Mint a bearer token for a user
    Token(TokenArgs),

    /// Print the leaderboard as JSON
    Leaderboard(LeaderboardArgs),

    /// Print a user's balance and completed tasks as JSON
    Status(StatusArgs),
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args, Debug)]
pub struct AddUserArgs {
    pub username: String,
}

#[derive(Args, Debug)]
pub struct AddTaskArgs {
    /// Unique task code, e.g. daily_checkin
    pub code: String,

    /// Human-readable title
    pub title: String,

    /// Points awarded on first completion
    pub points: i64,
}

#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Subject user id
    #[arg(long)]
    pub sub: i64,

    /// Optional role claim (e.g. admin)
    #[arg(long)]
    pub role: Option<String>,

    /// Token lifetime in seconds
    #[arg(long, default_value_t = 86_400)]
    pub ttl_secs: u64,
}

#[derive(Args, Debug)]
pub struct LeaderboardArgs {
    /// Number of entries (clamped to the configured range)
    #[arg(long)]
    pub limit: Option<i64>,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    pub user_id: i64,
}

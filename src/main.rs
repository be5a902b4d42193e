//! Points Ledger Server
//!
//! HTTP service and admin CLI for user point balances.

use anyhow::{Context, Result};
use clap::Parser;
use points_ledger::api::{ApiServer, start_server};
use points_ledger::auth::mint_token;
use points_ledger::cli::{
    AddTaskArgs, AddUserArgs, Cli, Command, LeaderboardArgs, ServeArgs, StatusArgs, TokenArgs,
};
use points_ledger::config::Config;
use points_ledger::db::Database;
use points_ledger::logging::{LogTarget, init_logging};
use points_ledger::rewards::RewardEngine;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut config = Config::load_or_default(cli.config.as_deref().map(Path::new))?;

    // Override paths from CLI arguments
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }

    match cli.command {
        Some(Command::Serve(args)) => run_server(config, args).await?,
        None => run_server(config, ServeArgs::default()).await?,
        Some(Command::AddUser(args)) => run_add_user(&config, args)?,
        Some(Command::AddTask(args)) => run_add_task(&config, args)?,
        Some(Command::Token(args)) => run_token(&config, args)?,
        Some(Command::Leaderboard(args)) => run_leaderboard(&config, args)?,
        Some(Command::Status(args)) => run_status(&config, args)?,
    }

    Ok(())
}

fn open_database(config: &Config) -> Result<Arc<Database>> {
    config.ensure_db_dir()?;
    let db = Database::open(&config.server.db_path).with_context(|| {
        format!(
            "opening database {}",
            config.server.db_path.to_string_lossy()
        )
    })?;
    Ok(Arc::new(db))
}

fn engine_for(config: &Config) -> Result<RewardEngine> {
    let db = open_database(config)?;
    Ok(RewardEngine::new(db, config.rewards, config.leaderboard))
}

async fn run_server(mut config: Config, args: ServeArgs) -> Result<()> {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    let engine = Arc::new(engine_for(&config)?);
    info!(
        db = %config.server.db_path.display(),
        bonus_to_referrer = config.rewards.bonus_to_referrer,
        bonus_to_referred = config.rewards.bonus_to_referred,
        "Ledger opened"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;

    let state = ApiServer::new(engine, &config.auth.jwt_secret);
    let handle = start_server(state, addr).await?;

    tokio::signal::ctrl_c().await?;
    handle.shutdown().await;
    Ok(())
}

fn run_add_user(config: &Config, args: AddUserArgs) -> Result<()> {
    let db = open_database(config)?;
    let account = db.create_account(&args.username)?;
    println!("{}", serde_json::to_string_pretty(&account)?);
    Ok(())
}

fn run_add_task(config: &Config, args: AddTaskArgs) -> Result<()> {
    let db = open_database(config)?;
    let task = db.upsert_task(&args.code, &args.title, args.points)?;
    println!("{}", serde_json::to_string_pretty(&task)?);
    Ok(())
}

fn run_token(config: &Config, args: TokenArgs) -> Result<()> {
    let token = mint_token(
        config.auth.jwt_secret.as_bytes(),
        args.sub,
        args.role.as_deref(),
        Duration::from_secs(args.ttl_secs),
    )?;
    println!("{}", token);
    Ok(())
}

fn run_leaderboard(config: &Config, args: LeaderboardArgs) -> Result<()> {
    let engine = engine_for(config)?;
    let entries = engine.leaderboard(args.limit)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({ "leaderboard": entries }))?
    );
    Ok(())
}

fn run_status(config: &Config, args: StatusArgs) -> Result<()> {
    let engine = engine_for(config)?;
    let status = engine.status(args.user_id)?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

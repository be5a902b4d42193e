//! Points Ledger Library
//!
//! Idempotent task rewards, one-time referral bonuses and a leaderboard over a
//! SQLite store. This module exports the core components for testing and
//! integration.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod rewards;
pub mod types;

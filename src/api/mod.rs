//! HTTP adapter over the reward engine.
//!
//! Authenticates bearer tokens, checks that the caller may act as the user in
//! the path, and translates ledger outcomes into JSON responses.

mod error;
mod server;

pub use error::ApiError;
pub use server::{ApiServer, ServerHandle, build_router, start_server};

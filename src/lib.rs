//! memecap - client for the meme captioning service
//!
//! This library provides the session store, API gateway client, auth
//! flows and page controllers behind the `memecap` CLI.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod pages;
pub mod session;
pub mod terminal;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export Args for the binary
pub use cli::Args;
pub use error::ClientError;

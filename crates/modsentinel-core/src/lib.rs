//! Core domain + application logic for the ModSentinel moderation bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind a
//! port (trait) implemented in the adapter crate.

pub mod audit;
pub mod chat;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod formatting;
pub mod ledger;
pub mod logging;
pub mod mutes;

pub use errors::{Error, Result};

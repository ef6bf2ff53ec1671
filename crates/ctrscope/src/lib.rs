#![forbid(unsafe_code)]

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod consolidate;
pub mod decode;
pub mod discovery;
pub mod export;
pub mod extract;
pub mod ingest;
pub mod locate;
pub mod metrics;
pub mod models;
pub mod remote;
pub mod storage;
pub mod utils;

pub use cli::app::{Cli, Command};

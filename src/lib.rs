// kegama-offline - Offline-first caching proxy for the Kegama web app
// Author: kelexine (https://github.com/kelexine)

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod network;
pub mod server;
pub mod utils;
pub mod worker;

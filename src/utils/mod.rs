//! Cross-cutting helpers for the offline proxy.
//!
//! - `logging`: tracing subscriber initialization.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;

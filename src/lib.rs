#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod config;
pub mod coordinator;
pub mod data;
pub mod error;
pub mod feed;
pub mod filter;
pub mod logging;
pub mod merge;
pub mod model;
pub mod reddit;
pub mod scroll;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;

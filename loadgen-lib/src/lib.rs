#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

pub mod client;
pub mod config;
pub mod iteration;
pub mod pacing;
pub mod report;
pub mod request;
pub mod runner;
pub mod utils;

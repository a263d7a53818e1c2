pub mod ai;
pub mod cli;
pub mod config;
pub mod error;
pub mod gitlab;
pub mod metrics;
pub mod output;
pub mod review;
pub mod server;
pub mod template;
pub mod tools;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

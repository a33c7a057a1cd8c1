pub mod api;
pub mod codec;
pub mod config;
pub mod engine;
pub mod gateway;
pub mod metrics_defs;
pub mod references;
pub mod response_cache;
pub mod types;
pub mod versions;

#[cfg(test)]
mod testutils;

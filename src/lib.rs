//! Pre-match statistics for a pair of clubs, built on fuzzy club-name
//! resolution over historical match datasets.

pub mod config;
pub mod fixtures;
pub mod game_stats;
pub mod http_client;
pub mod loader;
pub mod normalize;
pub mod reconcile;
pub mod refresh;
pub mod resolve;
pub mod similarity;
pub mod stats;
pub mod tables;

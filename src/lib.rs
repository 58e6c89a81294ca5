pub mod api;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod recommend;
pub mod refresh;
pub mod resolver;
pub mod source;
pub mod state;
pub mod stats;
pub mod types;

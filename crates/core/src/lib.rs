pub mod analysis;
pub mod common;
pub mod config;
pub mod market;
pub mod notify;

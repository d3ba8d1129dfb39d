// Library for the binary and integration tests

pub mod config;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod history;
pub mod models;
pub mod sampler;
pub mod sources;
pub mod version;

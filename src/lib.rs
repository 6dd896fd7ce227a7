pub mod config;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod loader;
pub mod output;
pub mod resolver;
pub mod samples;
pub mod store;
pub mod vocabulary;

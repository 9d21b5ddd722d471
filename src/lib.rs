pub mod analysis;
pub mod config;
pub mod enrich;
pub mod error;
pub mod ingest;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod schema;

pub mod analyzers;
pub mod cohort;
pub mod config;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod schema;
pub mod stats;
pub mod velocity;

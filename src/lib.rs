pub mod error;
pub mod clause;
pub mod builder;
pub mod report_query;
pub mod envelope;
pub mod stats;
pub mod transport;
pub mod config;
pub mod report;

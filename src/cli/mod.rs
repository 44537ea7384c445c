//! CLI subcommand implementations for the moray binary.

pub mod doctor;
pub mod ingest_cmd;
pub mod output;

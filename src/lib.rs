pub mod args;
pub mod client;
pub mod config;
pub mod date;
pub mod indices;
pub mod master;
pub mod report;
pub mod snapshot;

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod partition;
pub mod probe;
pub mod publish;
pub mod record;
pub mod topic;
pub mod worker;

pub use error::Error;
pub use worker::monitor_websites;

use clap::Parser;
use regex::Regex;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "uptime-producer")]
#[command(about = "Collects data on specified websites and publishes it to a streaming topic")]
pub struct Args {
    /// One or more comma delimited website URLs
    #[arg(short, long, required = true, value_delimiter = ',')]
    pub websites: Vec<String>,

    /// Topic to store data within. Created if it does not exist.
    #[arg(short, long)]
    pub topic: String,

    /// Pattern searched for in response bodies
    #[arg(short, long, default_value = "", value_parser = Regex::new)]
    pub regex: Regex,

    /// Path to the config file (defaults to the user config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// What one monitoring run checks and where it publishes.
#[derive(Debug, Clone)]
pub struct Job {
    pub websites: Vec<String>,
    pub topic: String,
    pub pattern: Regex,
}

impl Args {
    pub fn into_job(self) -> Job {
        Job {
            websites: self
                .websites
                .into_iter()
                .map(|site| site.trim().to_string())
                .filter(|site| !site.is_empty())
                .collect(),
            topic: self.topic,
            pattern: self.regex,
        }
    }
}

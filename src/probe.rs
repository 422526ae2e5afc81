use log::{error, info, warn};
use regex::Regex;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};

use crate::error::Error;

/// Outcome of one successful GET against a monitored site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteCheck {
    pub url: String,
    pub elapsed: Duration,
    pub status_code: u16,
    pub match_pattern: String,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteCheckResult {
    Completed(SiteCheck),
    /// The request never produced a response (bad URL, DNS, timeout, ...).
    Failed {
        url: String,
        reason: String,
    },
}

impl SiteCheckResult {
    pub fn url(&self) -> &str {
        match self {
            SiteCheckResult::Completed(check) => &check.url,
            SiteCheckResult::Failed { url, .. } => url,
        }
    }
}

pub struct SiteProber {
    client: Client,
}

impl SiteProber {
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    /// Probes every site in order. Always returns one result per site.
    pub async fn probe(&self, sites: &[String], pattern: &Regex) -> Vec<SiteCheckResult> {
        let mut batch = Vec::with_capacity(sites.len());

        for url in sites {
            let result = match self.check(url, pattern).await {
                Ok(check) => {
                    info!(
                        "{url}: {} in {:?} (matched: {})",
                        check.status_code, check.elapsed, check.matched
                    );
                    SiteCheckResult::Completed(check)
                }
                Err(e) => {
                    error!("Error checking {url}: {e}");
                    SiteCheckResult::Failed {
                        url: url.clone(),
                        reason: e.to_string(),
                    }
                }
            };
            batch.push(result);
        }

        batch
    }

    async fn check(&self, url: &str, pattern: &Regex) -> Result<SiteCheck, reqwest::Error> {
        let started = Instant::now();
        let resp = self.client.get(url).send().await?;
        let elapsed = started.elapsed();
        let status = resp.status();

        let matched = if status == StatusCode::OK {
            match resp.text().await {
                Ok(body) => pattern.is_match(&body),
                Err(e) => {
                    warn!("{url}: could not read response body: {e}");
                    false
                }
            }
        } else {
            false
        };

        Ok(SiteCheck {
            url: url.to_string(),
            elapsed,
            status_code: status.as_u16(),
            match_pattern: pattern.as_str().to_string(),
            matched,
        })
    }
}

use log::{info, warn};
use std::time::Duration;
use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::cli::Job;
use crate::client::PlatformClient;
use crate::config::Config;
use crate::error::Error;
use crate::partition;
use crate::probe::SiteProber;
use crate::publish::Publisher;
use crate::topic::TopicResolver;

/// Continuously probes the job's websites and publishes the results to its topic.
///
/// # Behavior
///
/// - Resolves the destination topic once, creating it if it does not exist
/// - Selects one partition for the lifetime of the run
/// - Probes every website in order, then publishes one produce call per result
/// - Sleeps for the configured interval before the next cycle
///
/// Returns `Ok(())` once `token` is cancelled. Cancellation also interrupts a
/// pending topic lookup or a cycle in progress; records already published stay
/// published.
///
/// # Errors
///
/// Any topic listing, topic creation or produce failure ends the run. Records
/// published earlier in the failing cycle stay published.
pub async fn monitor_websites(
    config: &Config,
    job: &Job,
    token: CancellationToken,
) -> Result<(), Error> {
    let client = PlatformClient::new(&config.platform()?)?;
    let resolver = TopicResolver::new(client.clone());
    let publisher = Publisher::new(client);
    let prober = SiteProber::new(Duration::from_secs(config.monitor.timeout_secs))?;

    let descriptor = select! {
        result = resolver.resolve_or_provision(&job.topic) => result?,
        () = token.cancelled() => {
            info!("Shutdown requested while resolving topic {}", job.topic);
            return Ok(());
        }
    };
    let Some(partition_count) = descriptor.partition_count() else {
        return Err(Error::Config("resolved topic has no partition count".into()));
    };
    let partition = partition::select(partition_count);

    // Initial configuration logging
    info!("Starting website monitoring...");
    info!(
        "Publishing to topic {} on partition {partition} (of {partition_count})",
        job.topic
    );
    info!(
        "Check interval: {} seconds",
        config.monitor.check_interval_secs
    );
    info!("Timeout: {} seconds", config.monitor.timeout_secs);
    if job.pattern.as_str().is_empty() {
        warn!("No regex set, every 200 response counts as a match");
    } else {
        info!("Matching response bodies against {}", job.pattern);
    }
    info!("Monitoring {} websites", job.websites.len());

    // Main monitoring loop
    loop {
        if token.is_cancelled() {
            info!("Shutdown requested, stopping monitor");
            break;
        }

        info!("Checking website status...");
        let cycle = async {
            let batch = prober.probe(&job.websites, &job.pattern).await;
            publisher.publish(&batch, &job.topic, partition).await
        };
        select! {
            result = cycle => {
                result?;
            }
            () = token.cancelled() => {
                info!("Shutdown requested during check cycle");
                break;
            }
        }

        // Interruptible sleep
        select! {
            () = sleep(Duration::from_secs(config.monitor.check_interval_secs)) => {},
            () = token.cancelled() => {
                info!("Shutdown requested during sleep");
                break;
            }
        }
    }

    info!("Website monitoring stopped gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiOptions, MonitorOptions};
    use regex::Regex;
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOPIC_PATH: &str = "/v1/project/acme/service/kafka-1/topic";
    const PRODUCE_PATH: &str = "/v1/project/acme/service/kafka-1/kafka/rest/topics/health/produce";

    fn config(platform: &MockServer, check_interval_secs: u64) -> Config {
        Config {
            api: ApiOptions {
                url: Some(platform.uri()),
                auth_token: Some("secret".to_string()),
                project: Some("acme".to_string()),
                service: Some("kafka-1".to_string()),
            },
            monitor: MonitorOptions {
                timeout_secs: 5,
                check_interval_secs,
            },
        }
    }

    fn listing() -> Value {
        json!({"topics": [{"topic_name": "health", "partitions": 3}]})
    }

    fn failure(message: &str) -> Value {
        json!({"errors": [{"message": message}]})
    }

    async fn site(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    async fn produce_bodies(platform: &MockServer) -> Vec<Value> {
        platform
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|req| req.url.path() == PRODUCE_PATH)
            .map(|req| req.body_json::<Value>().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_creates_topic_then_publishes_each_result() {
        let platform = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TOPIC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"topics": []})))
            .expect(1)
            .mount(&platform)
            .await;
        Mock::given(method("POST"))
            .and(path(TOPIC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "created"})))
            .expect(1)
            .mount(&platform)
            .await;
        Mock::given(method("POST"))
            .and(path(PRODUCE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"offsets": []})))
            .mount(&platform)
            .await;

        let a = site("all OK").await;
        let b = site("broken").await;
        let job = Job {
            websites: vec![a.uri(), b.uri()],
            topic: "health".to_string(),
            pattern: Regex::new("OK").unwrap(),
        };

        // Cancelled during the first sleep, so exactly one cycle runs.
        let token = CancellationToken::new();
        let run = {
            let config = config(&platform, 3600);
            let token = token.clone();
            tokio::spawn(async move { monitor_websites(&config, &job, token).await })
        };

        let mut bodies = Vec::new();
        for _ in 0..500 {
            bodies = produce_bodies(&platform).await;
            if bodies.len() >= 2 {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        token.cancel();
        run.await.unwrap().unwrap();

        assert_eq!(bodies.len(), 2);
        let partition = &bodies[0]["records"][0]["partition"];
        assert!(partition.as_u64().unwrap() <= 10);
        for body in &bodies {
            assert!(
                body["records"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .all(|r| &r["partition"] == partition)
            );
        }
        assert_eq!(bodies[0]["records"][3]["value"], "true");
        assert_eq!(bodies[1]["records"][3]["value"], "false");
    }

    #[tokio::test]
    async fn test_produce_error_ends_run() {
        let platform = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TOPIC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
            .mount(&platform)
            .await;
        Mock::given(method("POST"))
            .and(path(PRODUCE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"offsets": []})))
            .up_to_n_times(1)
            .mount(&platform)
            .await;
        Mock::given(method("POST"))
            .and(path(PRODUCE_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_json(failure("Not authorized")))
            .mount(&platform)
            .await;

        let a = site("OK").await;
        let b = site("OK").await;
        let job = Job {
            websites: vec![a.uri(), b.uri()],
            topic: "health".to_string(),
            pattern: Regex::new("OK").unwrap(),
        };

        let err = monitor_websites(&config(&platform, 0), &job, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Produce(_)));
        assert_eq!(
            err.to_string(),
            "Not authorized. Please view logs for more details."
        );
        assert_eq!(produce_bodies(&platform).await.len(), 2);
    }

    #[tokio::test]
    async fn test_topic_listing_error_ends_run_before_probing() {
        let platform = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TOPIC_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(failure("Invalid token")))
            .mount(&platform)
            .await;

        let target = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&target)
            .await;

        let job = Job {
            websites: vec![target.uri()],
            topic: "health".to_string(),
            pattern: Regex::new("").unwrap(),
        };

        let err = monitor_websites(&config(&platform, 0), &job, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TopicList(_)));
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_first_cycle() {
        let platform = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TOPIC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
            .mount(&platform)
            .await;
        Mock::given(method("POST"))
            .and(path(PRODUCE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&platform)
            .await;

        let job = Job {
            websites: vec!["http://a.test".to_string()],
            topic: "health".to_string(),
            pattern: Regex::new("").unwrap(),
        };
        let token = CancellationToken::new();
        token.cancel();

        monitor_websites(&config(&platform, 30), &job, token)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_interrupts_hung_platform_call() {
        let platform = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TOPIC_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(listing())
                    .set_delay(Duration::from_secs(3600)),
            )
            .mount(&platform)
            .await;

        let job = Job {
            websites: vec!["http://a.test".to_string()],
            topic: "health".to_string(),
            pattern: Regex::new("").unwrap(),
        };
        let token = CancellationToken::new();
        let run = {
            let config = config(&platform, 30);
            let token = token.clone();
            tokio::spawn(async move { monitor_websites(&config, &job, token).await })
        };

        sleep(Duration::from_millis(200)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), run)
            .await
            .expect("monitor kept running after cancellation");
        result.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cancel_interrupts_hung_produce_call() {
        let platform = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TOPIC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
            .mount(&platform)
            .await;
        Mock::given(method("POST"))
            .and(path(PRODUCE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"offsets": []}))
                    .set_delay(Duration::from_secs(3600)),
            )
            .mount(&platform)
            .await;

        let target = site("OK").await;
        let job = Job {
            websites: vec![target.uri()],
            topic: "health".to_string(),
            pattern: Regex::new("OK").unwrap(),
        };
        let token = CancellationToken::new();
        let run = {
            let config = config(&platform, 30);
            let token = token.clone();
            tokio::spawn(async move { monitor_websites(&config, &job, token).await })
        };

        for _ in 0..500 {
            if !produce_bodies(&platform).await.is_empty() {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), run)
            .await
            .expect("monitor kept running after cancellation");
        result.unwrap().unwrap();
    }
}

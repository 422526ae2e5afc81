use log::{info, warn};
use serde::Serialize;

use crate::client::{PlatformClient, first_message};
use crate::error::Error;

/// Partition count for topics created by this tool.
pub const PROVISIONED_PARTITIONS: u32 = 10;
pub const PROVISIONED_REPLICATION: u32 = 2;

/// What the platform knows about the destination topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicDescriptor {
    Missing,
    Present { partitions: u32 },
}

impl TopicDescriptor {
    pub fn exists(&self) -> bool {
        matches!(self, TopicDescriptor::Present { .. })
    }

    pub fn partition_count(&self) -> Option<u32> {
        match self {
            TopicDescriptor::Present { partitions } => Some(*partitions),
            TopicDescriptor::Missing => None,
        }
    }
}

/// Retention and cleanup knobs sent when creating a topic.
///
/// The values effectively disable segment rollover and retention for a
/// low-volume topic. They are passed through to the platform untouched.
#[derive(Debug, Clone, Serialize)]
pub struct TopicConfig {
    pub cleanup_policy: &'static str,
    pub compression_type: &'static str,
    pub delete_retention_ms: i64,
    pub file_delete_delay_ms: i64,
    pub flush_messages: i64,
    pub flush_ms: i64,
    pub index_interval_bytes: i64,
    pub max_compaction_lag_ms: i64,
    pub max_message_bytes: i64,
    pub message_downconversion_enable: bool,
    pub message_format_version: &'static str,
    pub message_timestamp_difference_max_ms: i64,
    pub message_timestamp_type: &'static str,
    pub min_cleanable_dirty_ratio: i64,
    pub min_compaction_lag_ms: i64,
    pub min_insync_replicas: u32,
    pub preallocate: bool,
    pub retention_bytes: i64,
    pub retention_ms: i64,
    pub segment_bytes: i64,
    pub segment_index_bytes: i64,
    pub segment_jitter_ms: i64,
    pub segment_ms: i64,
    pub unclean_leader_election_enable: bool,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            cleanup_policy: "delete",
            compression_type: "snappy",
            delete_retention_ms: 0,
            file_delete_delay_ms: 0,
            flush_messages: 0,
            flush_ms: 0,
            index_interval_bytes: 0,
            max_compaction_lag_ms: 1,
            max_message_bytes: 0,
            message_downconversion_enable: true,
            message_format_version: "0.8.0",
            message_timestamp_difference_max_ms: 0,
            message_timestamp_type: "CreateTime",
            min_cleanable_dirty_ratio: 1,
            min_compaction_lag_ms: 0,
            min_insync_replicas: 1,
            preallocate: true,
            retention_bytes: -1,
            retention_ms: 2_562_047_788_015,
            segment_bytes: 14,
            segment_index_bytes: 0,
            segment_jitter_ms: 0,
            segment_ms: 1,
            unclean_leader_election_enable: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicTag {
    pub key: String,
    pub value: String,
}

/// Body of a topic creation call. Built fresh for every call.
#[derive(Debug, Clone, Serialize)]
pub struct TopicProvisioningRequest {
    pub config: TopicConfig,
    pub min_insync_replicas: u32,
    pub partitions: u32,
    pub replication: u32,
    pub tags: Vec<TopicTag>,
    pub topic_name: String,
}

impl TopicProvisioningRequest {
    pub fn new(topic_name: &str) -> Self {
        Self {
            config: TopicConfig::default(),
            min_insync_replicas: 1,
            partitions: PROVISIONED_PARTITIONS,
            replication: PROVISIONED_REPLICATION,
            tags: vec![TopicTag {
                key: "string".to_string(),
                value: "string".to_string(),
            }],
            topic_name: topic_name.to_string(),
        }
    }
}

/// Looks up the destination topic and creates it when absent.
#[derive(Debug, Clone)]
pub struct TopicResolver {
    client: PlatformClient,
}

impl TopicResolver {
    pub fn new(client: PlatformClient) -> Self {
        Self { client }
    }

    /// Reports whether `topic_name` exists and how many partitions it has.
    ///
    /// A response without a topic collection is an error, never "not found".
    pub async fn resolve(&self, topic_name: &str) -> Result<TopicDescriptor, Error> {
        let listing = self.client.list_topics().await?;

        let Some(topics) = listing.topics else {
            let errors = listing.errors.unwrap_or_default();
            return Err(Error::TopicList(first_message(&errors)));
        };

        let found = topics.iter().find(|topic| topic.topic_name == topic_name);
        Ok(match found {
            Some(topic) => TopicDescriptor::Present {
                partitions: topic.partitions,
            },
            None => TopicDescriptor::Missing,
        })
    }

    /// Creates `topic_name` with the fixed provisioning configuration.
    ///
    /// Not idempotent: only call this after `resolve` reported the topic missing.
    pub async fn provision(&self, topic_name: &str) -> Result<TopicDescriptor, Error> {
        let request = TopicProvisioningRequest::new(topic_name);
        let response = self.client.create_topic(&request).await?;

        if let Some(errors) = response.errors {
            return Err(Error::TopicCreate(first_message(&errors)));
        }

        Ok(TopicDescriptor::Present {
            partitions: request.partitions,
        })
    }

    pub async fn resolve_or_provision(&self, topic_name: &str) -> Result<TopicDescriptor, Error> {
        let descriptor = self.resolve(topic_name).await?;
        if descriptor.exists() {
            info!("Topic {topic_name} found");
            return Ok(descriptor);
        }

        warn!("Topic {topic_name} does not exist, creating it");
        let descriptor = self.provision(topic_name).await?;
        info!(
            "Topic {topic_name} created with {PROVISIONED_PARTITIONS} partitions, replication {PROVISIONED_REPLICATION}"
        );
        Ok(descriptor)
    }
}

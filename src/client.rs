use log::debug;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use url::Url;

use crate::config::PlatformSettings;
use crate::error::Error;
use crate::record::ProduceBatch;
use crate::topic::TopicProvisioningRequest;

/// One entry of an `errors` array returned by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub message: String,
}

/// Body of the topic listing endpoint.
#[derive(Debug, Deserialize)]
pub struct TopicListResponse {
    pub topics: Option<Vec<TopicSummary>>,
    pub errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicSummary {
    pub topic_name: String,
    pub partitions: u32,
}

/// Body of the topic creation endpoint. Only the error list matters.
#[derive(Debug, Deserialize)]
pub struct CreateTopicResponse {
    #[serde(default, deserialize_with = "present")]
    pub errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Deserialize)]
pub struct ProduceResponse {
    #[serde(default)]
    pub offsets: Vec<ProduceOffset>,
    #[serde(default, deserialize_with = "present")]
    pub errors: Option<Vec<ApiError>>,
}

/// Any `errors` key counts as a failure, even `"errors": null`.
fn present<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<ApiError>>, D::Error> {
    let errors = Option::<Vec<ApiError>>::deserialize(deserializer)?;
    Ok(Some(errors.unwrap_or_default()))
}

#[derive(Debug, Deserialize)]
pub struct ProduceOffset {
    pub partition: Option<u32>,
    pub offset: Option<i64>,
    pub error: Option<String>,
}

/// Returns the first error message, or a generic one when the list is empty.
pub fn first_message(errors: &[ApiError]) -> String {
    errors.first().map_or_else(
        || "an unspecified platform error".to_string(),
        |e| e.message.clone(),
    )
}

/// Handle on the management and produce REST API of one project/service.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: Client,
    base: Url,
    auth_token: String,
    project: String,
    service: String,
}

impl PlatformClient {
    pub fn new(settings: &PlatformSettings) -> Result<Self, Error> {
        if settings.url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "API URL {} cannot be used as a base URL",
                settings.url
            )));
        }

        Ok(Self {
            http: Client::builder().timeout(settings.timeout).build()?,
            base: settings.url.clone(),
            auth_token: settings.auth_token.clone(),
            project: settings.project.clone(),
            service: settings.service.clone(),
        })
    }

    /// `GET /v1/project/{project}/service/{service}/topic`
    pub async fn list_topics(&self) -> Result<TopicListResponse, Error> {
        let url = self.service_url(&["topic"]);
        debug!("GET {url}");

        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.auth_token)
            .send()
            .await?;
        decode(resp).await
    }

    /// `POST /v1/project/{project}/service/{service}/topic`
    pub async fn create_topic(
        &self,
        request: &TopicProvisioningRequest,
    ) -> Result<CreateTopicResponse, Error> {
        let url = self.service_url(&["topic"]);
        debug!("POST {url} ({})", request.topic_name);
        self.post(url, request).await
    }

    /// `POST /v1/project/{project}/service/{service}/kafka/rest/topics/{topic}/produce`
    pub async fn produce(
        &self,
        topic: &str,
        batch: &ProduceBatch,
    ) -> Result<ProduceResponse, Error> {
        let url = self.service_url(&["kafka", "rest", "topics", topic, "produce"]);
        debug!("POST {url} ({} records)", batch.records.len());
        self.post(url, batch).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.auth_token)
            .json(body)
            .send()
            .await?;
        decode(resp).await
    }

    fn service_url(&self, tail: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked in `new`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend([
                    "v1",
                    "project",
                    self.project.as_str(),
                    "service",
                    self.service.as_str(),
                ])
                .extend(tail);
        }
        url
    }
}

// Status codes are not inspected: the platform reports failures in the body.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

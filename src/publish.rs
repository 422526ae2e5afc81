use log::{debug, info, warn};

use crate::client::{PlatformClient, first_message};
use crate::error::Error;
use crate::probe::SiteCheckResult;
use crate::record::ProduceBatch;

#[derive(Debug, Clone)]
pub struct Publisher {
    client: PlatformClient,
}

impl Publisher {
    pub fn new(client: PlatformClient) -> Self {
        Self { client }
    }

    /// Sends one produce call per completed check, in batch order.
    ///
    /// Stops at the first failure. Calls already acknowledged are not rolled back.
    /// Returns the number of produce calls made.
    pub async fn publish(
        &self,
        batch: &[SiteCheckResult],
        topic: &str,
        partition: u32,
    ) -> Result<usize, Error> {
        let mut sent = 0;

        for result in batch {
            let Some(encoded) = ProduceBatch::encode(result, partition) else {
                warn!("{}: probe failed, nothing to publish", result.url());
                continue;
            };

            let response = self.client.produce(topic, &encoded).await?;
            if let Some(errors) = response.errors {
                return Err(Error::Produce(first_message(&errors)));
            }

            for offset in &response.offsets {
                match &offset.error {
                    Some(e) => warn!("{}: record rejected: {e}", result.url()),
                    None => debug!(
                        "{}: partition {:?} offset {:?}",
                        result.url(),
                        offset.partition,
                        offset.offset
                    ),
                }
            }
            sent += 1;
        }

        info!("Published {sent} of {} results to {topic}", batch.len());
        Ok(sent)
    }
}

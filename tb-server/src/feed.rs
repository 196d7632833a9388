//! Upstream feed client
//!
//! One fetch per tracked race: the feed serves the latest position
//! history for a race as a single binary buffer.

use anyhow::{bail, Context, Result};

pub struct FeedClient {
    client: reqwest::Client,
    base_url: String,
}

impl FeedClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn latest_positions_url(&self, race: &str) -> String {
        format!("{}/BIN/{}/LatestPositions3", self.base_url, race)
    }

    /// Fetch the raw latest-positions buffer for one race.
    pub async fn fetch_latest(&self, race: &str) -> Result<Vec<u8>> {
        let url = self.latest_positions_url(race);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("feed request to {url} failed"))?;

        if !response.status().is_success() {
            bail!("feed returned {} for {url}", response.status());
        }

        Ok(response.bytes().await?.to_vec())
    }
}

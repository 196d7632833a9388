//! Ingestion sink implementations
//!
//! Sinks forward resolved fixes to the telemetry server, one fix per
//! destination device.

use anyhow::Result;
use tb_core::Fix;

/// Trait for fix sinks
pub trait Sink: Send + Sync {
    fn send(&self, device_id: &str, fix: &Fix) -> Result<()>;
}

/// Osmand-protocol HTTP sink: fixes become query parameters on a POST
/// to the ingestion endpoint.
pub struct OsmandSink {
    endpoint: String,
    client: reqwest::Client,
}

impl OsmandSink {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

/// Query string for one fix in the Osmand position protocol.
pub fn osmand_query(device_id: &str, fix: &Fix) -> String {
    format!(
        "id={}&lat={}&lon={}&speed={}&bearing={}&timestamp={}",
        device_id, fix.lat, fix.lon, fix.speed_kmh, fix.bearing, fix.timestamp
    )
}

impl Sink for OsmandSink {
    fn send(&self, device_id: &str, fix: &Fix) -> Result<()> {
        let url = format!("{}/?{}", self.endpoint, osmand_query(device_id, fix));
        // Fire and forget (non-blocking)
        let client = self.client.clone();
        let device_id = device_id.to_string();
        tokio::spawn(async move {
            match client.post(&url).send().await {
                Ok(response) if response.status() == reqwest::StatusCode::BAD_REQUEST => {
                    tracing::warn!(
                        "ingestion rejected {device_id}: create a device with a matching identifier on the server"
                    );
                }
                Ok(response) if !response.status().is_success() => {
                    tracing::error!(
                        "ingestion returned {} for {device_id}",
                        response.status()
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("ingestion sink error for {device_id}: {e}");
                }
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_osmand_query_parameters() {
        let fix = Fix {
            lat: 12.34567,
            lon: -76.54321,
            speed_kmh: 0.0,
            bearing: 0.0,
            timestamp: 1050,
        };
        assert_eq!(
            osmand_query("dev-42", &fix),
            "id=dev-42&lat=12.34567&lon=-76.54321&speed=0&bearing=0&timestamp=1050"
        );
    }
}

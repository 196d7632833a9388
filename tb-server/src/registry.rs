//! Device registry route discovery
//!
//! The registry (a Traccar server) knows which of its devices mirror which
//! feed vehicle: an enabled device opts in with an attribute whose key is
//! the configured keyword (optionally suffixed with one digit) and whose
//! value is "<race> <vehicle-number>". Scanning all devices yields the
//! route table the poller schedules fetch jobs from.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

/// race -> vehicle key -> destination device unique ids
pub type RouteTable = HashMap<String, HashMap<String, Vec<String>>>;

/// One device as the registry API reports it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub unique_id: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

/// Matches routing attributes on registry devices.
#[derive(Debug)]
pub struct RouteMatcher {
    key_pattern: Regex,
    value_pattern: Regex,
}

impl RouteMatcher {
    pub fn new(keyword: &str) -> Result<Self> {
        let key_pattern = Regex::new(&format!(
            "^{}[0-9]?$",
            regex::escape(&keyword.to_lowercase())
        ))
        .with_context(|| format!("route keyword {keyword:?} does not form a valid pattern"))?;
        // "<alphanumeric race> <numeric vehicle>"
        let value_pattern = Regex::new("^[A-Za-z0-9]* [0-9]*$")
            .context("attribute value pattern")?;
        Ok(Self {
            key_pattern,
            value_pattern,
        })
    }

    /// Build the route table from a registry device listing.
    ///
    /// Disabled devices, non-matching attribute keys, and malformed
    /// values are skipped. Races are lowercased; a device may appear
    /// under several routes via multiple keyed attributes.
    pub fn routes(&self, devices: &[Device]) -> RouteTable {
        let mut routes = RouteTable::new();
        for device in devices.iter().filter(|d| !d.disabled) {
            for (key, value) in &device.attributes {
                if !self.key_pattern.is_match(&key.to_lowercase()) {
                    continue;
                }
                let Some(value) = value.as_str() else {
                    continue;
                };
                let value = value.trim();
                if !self.value_pattern.is_match(value) {
                    continue;
                }
                let Some((race, vehicle)) = value.split_once(' ') else {
                    continue;
                };
                routes
                    .entry(race.to_lowercase())
                    .or_default()
                    .entry(vehicle.to_string())
                    .or_default()
                    .push(device.unique_id.clone());
            }
        }
        routes
    }
}

/// Fetches device listings from the registry API.
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
    matcher: RouteMatcher,
}

impl RegistryClient {
    pub fn new(
        base_url: String,
        user: String,
        password: String,
        keyword: &str,
    ) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            user,
            password,
            matcher: RouteMatcher::new(keyword)?,
        })
    }

    /// Fetch all devices and derive the current route table.
    pub async fn fetch_routes(&self) -> Result<RouteTable> {
        let url = format!("{}/api/devices?all=true", self.base_url);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await
            .with_context(|| format!("registry request to {url} failed"))?;

        if !response.status().is_success() {
            bail!("registry returned {} for {url}", response.status());
        }

        let devices: Vec<Device> = response
            .json()
            .await
            .context("registry device listing is not valid JSON")?;

        Ok(self.matcher.routes(&devices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device(unique_id: &str, disabled: bool, attributes: serde_json::Value) -> Device {
        serde_json::from_value(json!({
            "uniqueId": unique_id,
            "disabled": disabled,
            "attributes": attributes,
        }))
        .unwrap()
    }

    #[test]
    fn test_keyword_matches_bare_and_single_digit_suffix() {
        let matcher = RouteMatcher::new("yb").unwrap();
        let devices = vec![
            device("dev-a", false, json!({"yb": "fastnet 12"})),
            device("dev-b", false, json!({"yb1": "fastnet 13"})),
            device("dev-c", false, json!({"yb12": "fastnet 14"})),
            device("dev-d", false, json!({"ybx": "fastnet 15"})),
        ];
        let routes = matcher.routes(&devices);
        let race = routes.get("fastnet").unwrap();
        assert_eq!(race.get("12").unwrap(), &vec!["dev-a".to_string()]);
        assert_eq!(race.get("13").unwrap(), &vec!["dev-b".to_string()]);
        assert!(race.get("14").is_none());
        assert!(race.get("15").is_none());
    }

    #[test]
    fn test_key_matching_is_case_insensitive() {
        let matcher = RouteMatcher::new("yb").unwrap();
        let devices = vec![device("dev-a", false, json!({"YB": "vendee 3"}))];
        let routes = matcher.routes(&devices);
        assert!(routes.get("vendee").unwrap().contains_key("3"));
    }

    #[test]
    fn test_race_is_lowercased_and_value_trimmed() {
        let matcher = RouteMatcher::new("yb").unwrap();
        let devices = vec![device("dev-a", false, json!({"yb": "  Fastnet 7  "}))];
        let routes = matcher.routes(&devices);
        assert!(routes.get("fastnet").unwrap().contains_key("7"));
    }

    #[test]
    fn test_disabled_devices_are_skipped() {
        let matcher = RouteMatcher::new("yb").unwrap();
        let devices = vec![device("dev-a", true, json!({"yb": "fastnet 12"}))];
        assert!(matcher.routes(&devices).is_empty());
    }

    #[test]
    fn test_malformed_values_are_skipped() {
        let matcher = RouteMatcher::new("yb").unwrap();
        let devices = vec![
            device("dev-a", false, json!({"yb": "no-separator"})),
            device("dev-b", false, json!({"yb": "too many parts 1"})),
            device("dev-c", false, json!({"yb": 42})),
        ];
        assert!(matcher.routes(&devices).is_empty());
    }

    #[test]
    fn test_multiple_devices_share_a_vehicle() {
        let matcher = RouteMatcher::new("yb").unwrap();
        let devices = vec![
            device("dev-a", false, json!({"yb": "fastnet 12"})),
            device("dev-b", false, json!({"yb": "fastnet 12"})),
        ];
        let routes = matcher.routes(&devices);
        let mut ids = routes["fastnet"]["12"].clone();
        ids.sort();
        assert_eq!(ids, vec!["dev-a".to_string(), "dev-b".to_string()]);
    }

    #[test]
    fn test_one_device_may_follow_two_races() {
        let matcher = RouteMatcher::new("yb").unwrap();
        let devices = vec![device(
            "dev-a",
            false,
            json!({"yb": "fastnet 12", "yb2": "vendee 4"}),
        )];
        let routes = matcher.routes(&devices);
        assert!(routes["fastnet"].contains_key("12"));
        assert!(routes["vendee"].contains_key("4"));
    }

    #[test]
    fn test_keyword_is_escaped() {
        // A keyword with regex metacharacters must not panic or over-match.
        let matcher = RouteMatcher::new("y.b").unwrap();
        let devices = vec![device("dev-a", false, json!({"yxb": "fastnet 1"}))];
        assert!(matcher.routes(&devices).is_empty());
    }
}

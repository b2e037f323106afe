//! Off-chain validator metadata used to enrich proposal candidates for display
//!
//! Nothing here influences protocol behavior; a missing or stale feed only degrades the detail
//! shown next to a validator identity.

use crate::core::{InglError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use tracing::debug;

const EARTH_RADIUS_KM: f64 = 6371.0;
const NEAREST_NEIGHBOURS: usize = 5;

/// One entry of the validator metadata feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatorDetails {
    /// Validator identity, base58
    pub account: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub latitude: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub longitude: Option<String>,
    #[serde(default)]
    pub software_version: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub skipped_slot_percent: Option<String>,
    #[serde(default)]
    pub autonomous_system_number: Option<u64>,
}

/// The feed reports some numeric fields as strings and others as numbers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(text)) => Some(text),
        Some(serde_json::Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

impl ValidatorDetails {
    fn coordinates(&self) -> Option<(f64, f64)> {
        let latitude = self.latitude.as_deref()?.trim().parse().ok()?;
        let longitude = self.longitude.as_deref()?.trim().parse().ok()?;
        Some((latitude, longitude))
    }
}

/// A validator identity with whatever the feed knows about it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedValidator {
    pub identity: String,
    pub details: Option<ValidatorDetails>,
    /// Share of feed validators hosted in the same autonomous system, in percent
    pub asn_concentration: f64,
    /// Mean distance in km to the nearest other validators
    pub average_distance: Option<f64>,
}

/// Client for the validator metadata feed
pub struct ValidatorFeed {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl ValidatorFeed {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            token,
        }
    }

    pub async fn fetch(&self) -> Result<Vec<ValidatorDetails>> {
        let mut request = self.http.get(&self.url);
        if let Some(token) = &self.token {
            request = request.header("Token", token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(InglError::Feed(format!(
                "{} returned {}",
                self.url,
                response.status()
            )));
        }

        let details: Vec<ValidatorDetails> = response.json().await?;
        debug!("Validator feed returned {} entries", details.len());
        Ok(details)
    }
}

/// Great-circle distance in km
pub fn haversine_km((lat1, lon1): (f64, f64), (lat2, lon2): (f64, f64)) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Attach feed details, ASN concentration and neighbour distance to each identity
pub fn enrich(identities: &[String], feed: &[ValidatorDetails]) -> Vec<EnrichedValidator> {
    let mut asn_counts: HashMap<u64, usize> = HashMap::new();
    for entry in feed {
        if let Some(asn) = entry.autonomous_system_number {
            *asn_counts.entry(asn).or_default() += 1;
        }
    }
    let asn_total: usize = asn_counts.values().sum();

    identities
        .iter()
        .map(|identity| {
            let details = feed.iter().find(|entry| &entry.account == identity).cloned();

            let asn_concentration = details
                .as_ref()
                .and_then(|d| d.autonomous_system_number)
                .and_then(|asn| asn_counts.get(&asn))
                .map_or(0.0, |count| *count as f64 * 100.0 / asn_total as f64);

            let average_distance = details
                .as_ref()
                .and_then(ValidatorDetails::coordinates)
                .and_then(|origin| nearest_average_distance(identity, origin, feed));

            EnrichedValidator {
                identity: identity.clone(),
                details,
                asn_concentration,
                average_distance,
            }
        })
        .collect()
}

fn nearest_average_distance(identity: &str, origin: (f64, f64), feed: &[ValidatorDetails]) -> Option<f64> {
    let mut distances: Vec<f64> = feed
        .iter()
        .filter(|entry| entry.account != identity)
        .filter_map(ValidatorDetails::coordinates)
        .map(|point| haversine_km(origin, point))
        .collect();
    if distances.is_empty() {
        return None;
    }

    distances.sort_by(f64::total_cmp);
    let nearest = &distances[..distances.len().min(NEAREST_NEIGHBOURS)];
    Some(nearest.iter().sum::<f64>() / nearest.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(account: &str, lat: &str, lon: &str, asn: u64) -> ValidatorDetails {
        ValidatorDetails {
            account: account.to_string(),
            latitude: Some(lat.to_string()),
            longitude: Some(lon.to_string()),
            autonomous_system_number: Some(asn),
            ..ValidatorDetails::default()
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // Paris to London
        let distance = haversine_km((48.8566, 2.3522), (51.5074, -0.1278));
        assert!((distance - 343.5).abs() < 1.0, "{distance}");
        assert_eq!(haversine_km((10.0, 10.0), (10.0, 10.0)), 0.0);
    }

    #[test]
    fn test_enrich_computes_concentration_and_distance() {
        let feed = vec![
            validator("a", "0", "0", 1),
            validator("b", "0", "1", 1),
            validator("c", "0", "2", 2),
            validator("d", "0", "3", 3),
        ];
        let enriched = enrich(&["a".to_string(), "zzz".to_string()], &feed);

        assert_eq!(enriched[0].asn_concentration, 50.0);
        let distance = enriched[0].average_distance.unwrap();
        let expected = (haversine_km((0.0, 0.0), (0.0, 1.0))
            + haversine_km((0.0, 0.0), (0.0, 2.0))
            + haversine_km((0.0, 0.0), (0.0, 3.0)))
            / 3.0;
        assert!((distance - expected).abs() < 1e-9);

        assert!(enriched[1].details.is_none());
        assert_eq!(enriched[1].asn_concentration, 0.0);
        assert!(enriched[1].average_distance.is_none());
    }

    #[test]
    fn test_feed_entry_parses_with_missing_fields() {
        let json = r#"[
            {"account": "abc", "autonomous_system_number": 16509, "extra": true},
            {"account": "def", "latitude": 48.85, "longitude": "2.35"}
        ]"#;
        let parsed: Vec<ValidatorDetails> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed[0].account, "abc");
        assert_eq!(parsed[0].autonomous_system_number, Some(16509));
        assert!(parsed[0].latitude.is_none());
        assert_eq!(parsed[1].coordinates(), Some((48.85, 2.35)));
    }
}

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::RouteError;
use crate::types::{BoundingBox, GeoPoint, OsmNodeId};

const WATERWAY_KINDS: &str = "river|stream|canal|riverbank|drain";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverpassConfig {
    pub endpoint: String,
    /// Server-side time limit put into the query header.
    pub query_timeout_secs: u32,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://overpass-api.de/api/interpreter".to_string(),
            query_timeout_secs: 25,
        }
    }
}

// Raw Overpass elements. Ways and nodes come in one flat list.
#[derive(Debug, Default, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OsmElement>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OsmElement {
    Node {
        id: OsmNodeId,
        lat: f64,
        lon: f64,
    },
    Way {
        id: u64,
        #[serde(default)]
        nodes: Vec<OsmNodeId>,
    },
    #[serde(other)]
    Other,
}

/// Node table and ways of one query response.
#[derive(Debug, Default)]
pub struct WaterwayData {
    pub nodes: HashMap<OsmNodeId, GeoPoint>,
    pub ways: Vec<Vec<OsmNodeId>>,
}

impl WaterwayData {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() || self.ways.is_empty()
    }
}

impl From<OverpassResponse> for WaterwayData {
    fn from(response: OverpassResponse) -> Self {
        // Ways may reference nodes listed after them, so keep both and join later.
        let mut data = WaterwayData::default();
        for element in response.elements {
            match element {
                OsmElement::Node { id, lat, lon } => {
                    data.nodes.insert(id, GeoPoint::new(lon, lat));
                }
                OsmElement::Way { nodes, .. } => {
                    if nodes.len() >= 2 {
                        data.ways.push(nodes);
                    }
                }
                OsmElement::Other => {}
            }
        }
        data
    }
}

/// Anything that can answer a bounding-box waterway query.
#[allow(async_fn_in_trait)]
pub trait WaterwaySource {
    async fn fetch_waterways(&self, bbox: &BoundingBox) -> Result<OverpassResponse, RouteError>;
}

pub fn waterway_query(bbox: &BoundingBox, timeout_secs: u32) -> String {
    format!(
        r#"[out:json][timeout:{}];
(
  way["waterway"~"^({})$"]({},{},{},{});
);
out body;
>;
out skel qt;"#,
        timeout_secs,
        WATERWAY_KINDS,
        bbox.min_latitude,
        bbox.min_longitude,
        bbox.max_latitude,
        bbox.max_longitude
    )
}

/// Overpass API client. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct OverpassClient {
    config: OverpassConfig,
    client: Client,
}

impl OverpassClient {
    pub fn new(config: OverpassConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

impl WaterwaySource for OverpassClient {
    async fn fetch_waterways(&self, bbox: &BoundingBox) -> Result<OverpassResponse, RouteError> {
        let query = waterway_query(bbox, self.config.query_timeout_secs);
        log::info!("Querying waterways for bbox {}", bbox.cache_key());

        let response = self
            .client
            .post(&self.config.endpoint)
            .body(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RouteError::UpstreamStatus(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: OverpassResponse = serde_json::from_str(&body)?;
        log::info!("Received {} OSM elements", parsed.elements.len());
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_scoped_to_bbox() {
        let bbox = BoundingBox {
            min_latitude: 10.71,
            min_longitude: 106.63,
            max_latitude: 10.8,
            max_longitude: 106.72,
        };
        let query = waterway_query(&bbox, 25);
        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.contains(r#"way["waterway"~"^(river|stream|canal|riverbank|drain)$"](10.71,106.63,10.8,106.72);"#));
        assert!(query.contains("out skel qt;"));
    }

    #[test]
    fn parses_nodes_and_ways_in_any_order() {
        let json = r#"{
            "version": 0.6,
            "elements": [
                {"type": "way", "id": 10, "nodes": [1, 2, 3], "tags": {"waterway": "river"}},
                {"type": "node", "id": 1, "lat": 10.0, "lon": 106.0},
                {"type": "node", "id": 2, "lat": 10.1, "lon": 106.1},
                {"type": "relation", "id": 99, "members": []},
                {"type": "way", "id": 11, "nodes": [3]}
            ]
        }"#;
        let response: OverpassResponse = serde_json::from_str(json).unwrap();
        let data = WaterwayData::from(response);

        assert_eq!(data.nodes.len(), 2);
        assert_eq!(data.nodes[&2], GeoPoint::new(106.1, 10.1));
        // Single-node ways carry no segments.
        assert_eq!(data.ways, vec![vec![1, 2, 3]]);
        assert!(!data.is_empty());
    }

    #[test]
    fn empty_response_has_no_data() {
        let response: OverpassResponse = serde_json::from_str(r#"{"elements": []}"#).unwrap();
        assert!(WaterwayData::from(response).is_empty());
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: OverpassConfig = serde_json::from_str(r#"{"query_timeout_secs": 60}"#).unwrap();
        assert_eq!(config.query_timeout_secs, 60);
        assert_eq!(config.endpoint, "https://overpass-api.de/api/interpreter");
    }
}

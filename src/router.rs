//! River-aware route resolution between two points.
//!
//! Every failure (area too large, upstream error, empty or disconnected
//! graph) resolves to `None` so callers can always fall back to a straight line.

use serde::Deserialize;

use crate::cache::RouteCache;
use crate::error::RouteError;
use crate::graph::WaterwayGraph;
use crate::osm_fetcher::{WaterwayData, WaterwaySource};
use crate::types::{BoundingBox, GeoPoint, Polyline};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    /// Largest latitude or longitude span that will be queried.
    pub max_span_degrees: f64,
    /// Margin added around the two points.
    pub padding_degrees: f64,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            max_span_degrees: 0.25,
            padding_degrees: 0.02,
        }
    }
}

/// Resolves waterway routes through a [`WaterwaySource`], memoised in a [`RouteCache`].
#[derive(Debug, Clone)]
pub struct WaterwayRouter<S> {
    source: S,
    cache: RouteCache,
}

impl<S: WaterwaySource> WaterwayRouter<S> {
    pub fn new(source: S, cache: RouteCache) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &RouteCache {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn clear_route_cache(&self) {
        log::info!("Clearing {} cached routes", self.cache.len());
        self.cache.clear();
    }

    /// Shortest waterway path from near `start` to near `end`, or `None`.
    pub async fn resolve_route(
        &self,
        start: GeoPoint,
        end: GeoPoint,
        options: &RouteOptions,
    ) -> Option<Polyline> {
        let bbox = BoundingBox::around(&start, &end, options.padding_degrees);
        if bbox.exceeds(options.max_span_degrees) {
            log::info!(
                "Skipping waterway query: span {:.4}x{:.4} exceeds {}",
                bbox.latitude_span(),
                bbox.longitude_span(),
                options.max_span_degrees
            );
            return None;
        }

        let key = bbox.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            log::debug!("Route cache hit for {}", key);
            return cached;
        }

        let route = match self.fetch_route(&bbox, &start, &end).await {
            Ok(route) => route,
            Err(e) => {
                log::warn!("Waterway routing unavailable, falling back: {}", e);
                None
            }
        };
        self.cache.set(key, route.clone());
        route
    }

    async fn fetch_route(
        &self,
        bbox: &BoundingBox,
        start: &GeoPoint,
        end: &GeoPoint,
    ) -> Result<Option<Polyline>, RouteError> {
        let response = self.source.fetch_waterways(bbox).await?;
        let data = WaterwayData::from(response);
        if data.is_empty() {
            log::info!("No waterways in bbox {}", bbox.cache_key());
            return Ok(None);
        }
        Ok(route_through(&WaterwayGraph::from_data(&data), start, end))
    }
}

/// Snaps both points to the graph and maps the shortest path back to positions.
pub fn route_through(graph: &WaterwayGraph, start: &GeoPoint, end: &GeoPoint) -> Option<Polyline> {
    let start_node = graph.closest_node(start)?;
    let end_node = graph.closest_node(end)?;

    let Some(path) = graph.shortest_path(start_node, end_node) else {
        log::info!("Node {} unreachable from node {}", end_node, start_node);
        return None;
    };

    let points: Vec<GeoPoint> = path.iter().filter_map(|id| graph.location(*id)).collect();
    if points.len() < 2 {
        return None;
    }
    Some(Polyline::new(points))
}

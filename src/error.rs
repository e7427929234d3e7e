use thiserror::Error;

/// Failures while fetching or decoding waterway geometry.
///
/// These never reach callers of `resolve_route`; they degrade to "no route".
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("geodata request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("geodata service returned status {0}")]
    UpstreamStatus(u16),
    #[error("malformed geodata response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures reported by the map surface.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("layer {0} does not exist")]
    MissingLayer(String),
    #[error("source {0} does not exist")]
    MissingSource(String),
    #[error("marker operation failed: {0}")]
    Marker(String),
    #[error("map is not available: {0}")]
    Unavailable(String),
}

use wasm_bindgen::prelude::*;
use serde::Deserialize;
use log::Level;
use wasm_bindgen_futures::future_to_promise;
use wasm_bindgen_futures::js_sys;

pub mod animation;
pub mod cache;
pub mod controller;
pub mod error;
pub mod geodesy;
pub mod graph;
pub mod map;
pub mod osm_fetcher;
pub mod router;
pub mod types;

#[cfg(test)]
mod test_support;

use self::cache::RouteCache;
use self::osm_fetcher::{OverpassClient, OverpassConfig};
use self::router::{RouteOptions, WaterwayRouter};
use self::types::{GeoPoint, Polyline};

#[derive(Deserialize)]
pub struct JsLocation {
    pub lat: f64,
    pub lng: f64,
}

impl From<JsLocation> for GeoPoint {
    fn from(location: JsLocation) -> Self {
        GeoPoint::new(location.lng, location.lat)
    }
}

#[derive(Deserialize)]
pub struct RouteParams {
    pub start: JsLocation,
    pub end: JsLocation,
    #[serde(default)]
    pub options: RouteOptions,
}

thread_local! {
    // One router for the page, so the cache outlives individual lookups.
    static ROUTER: WaterwayRouter<OverpassClient> =
        WaterwayRouter::new(OverpassClient::new(OverpassConfig::default()), RouteCache::new());
}

#[wasm_bindgen]
pub fn rust_init() -> Result<(), JsValue> {
    console_log::init_with_level(Level::Info).map_err(|e| JsValue::from_str(&e.to_string()))?;
    log::info!("Logger initialized from library");
    Ok(())
}

pub async fn resolve_route_async(params_json: &str) -> Result<Option<Polyline>, String> {
    let params: RouteParams = serde_json::from_str(params_json).map_err(|e| e.to_string())?;
    let router = ROUTER.with(WaterwayRouter::clone);
    let route = router
        .resolve_route(params.start.into(), params.end.into(), &params.options)
        .await;
    Ok(route)
}

/// Resolves to `[[lng, lat], ...]`, or `null` when there is no waterway route.
#[wasm_bindgen]
pub fn resolve_route(params: String) -> js_sys::Promise {
    future_to_promise(async move {
        match resolve_route_async(&params).await {
            Ok(Some(route)) => serde_wasm_bindgen::to_value(&route).map_err(JsValue::from),
            Ok(None) => Ok(JsValue::NULL),
            Err(e) => Err(JsValue::from_str(&e)),
        }
    })
}

#[wasm_bindgen]
pub fn clear_route_cache() {
    ROUTER.with(WaterwayRouter::clear_route_cache);
}

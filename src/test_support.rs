//! In-memory stand-ins for the geodata service, the map and the frame clock.

use geojson::Feature;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{MapError, RouteError};
use crate::map::{
    CameraMove, FrameHandle, FrameScheduler, LineLayer, MapSurface, Marker, MarkerGlyph,
    MarkerKind, ViewportBounds,
};
use crate::osm_fetcher::{OverpassResponse, WaterwaySource};
use crate::types::{BoundingBox, GeoPoint};

/// Four river nodes 0.001 degrees apart east of (106.700, 10.780).
pub fn chain_response() -> &'static str {
    r#"{"elements": [
        {"type": "way", "id": 500, "nodes": [1, 2, 3, 4], "tags": {"waterway": "river"}},
        {"type": "node", "id": 1, "lat": 10.780, "lon": 106.700},
        {"type": "node", "id": 2, "lat": 10.780, "lon": 106.701},
        {"type": "node", "id": 3, "lat": 10.780, "lon": 106.702},
        {"type": "node", "id": 4, "lat": 10.780, "lon": 106.703}
    ]}"#
}

pub struct MockSource {
    body: Result<String, u16>,
    calls: Rc<Cell<usize>>,
}

impl MockSource {
    pub fn with_body(body: &str) -> Self {
        Self {
            body: Ok(body.to_string()),
            calls: Rc::default(),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            body: Err(status),
            calls: Rc::default(),
        }
    }

    pub fn calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }
}

impl WaterwaySource for MockSource {
    async fn fetch_waterways(&self, _bbox: &BoundingBox) -> Result<OverpassResponse, RouteError> {
        self.calls.set(self.calls.get() + 1);
        match &self.body {
            Ok(body) => Ok(serde_json::from_str(body)?),
            Err(status) => Err(RouteError::UpstreamStatus(*status)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarkerRecord {
    pub kind: MarkerKind,
    pub glyph: MarkerGlyph,
    pub positions: Vec<GeoPoint>,
    pub fallback: Option<MarkerGlyph>,
    pub removed: bool,
}

impl MarkerRecord {
    pub fn position(&self) -> GeoPoint {
        *self.positions.last().expect("marker has a position")
    }
}

#[derive(Debug, Default)]
pub struct MapLog {
    pub sources: HashMap<String, Feature>,
    pub source_updates: usize,
    pub layers: Vec<LineLayer>,
    pub markers: Vec<MarkerRecord>,
    pub fly_to: Vec<CameraMove>,
    pub ease_to: Vec<CameraMove>,
    pub viewport: Option<ViewportBounds>,
    pub destroy_calls: usize,
    pub fail_remove_kinds: Vec<MarkerKind>,
    pub fail_source_removal: bool,
}

impl MapLog {
    pub fn live_markers(&self, kind: MarkerKind) -> Vec<&MarkerRecord> {
        self.markers
            .iter()
            .filter(|m| m.kind == kind && !m.removed)
            .collect()
    }

    pub fn line_coordinates(&self, source: &str) -> Option<Vec<Vec<f64>>> {
        let feature = self.sources.get(source)?;
        match &feature.geometry.as_ref()?.value {
            geojson::Value::LineString(coords) => Some(coords.clone()),
            _ => None,
        }
    }
}

#[derive(Clone, Default)]
pub struct MockMap {
    pub log: Rc<RefCell<MapLog>>,
}

pub struct MockMarker {
    log: Rc<RefCell<MapLog>>,
    index: usize,
}

impl Marker for MockMarker {
    fn set_position(&mut self, at: GeoPoint) -> Result<(), MapError> {
        let mut log = self.log.borrow_mut();
        let record = &mut log.markers[self.index];
        if record.removed {
            return Err(MapError::Marker("marker was removed".to_string()));
        }
        record.positions.push(at);
        Ok(())
    }

    fn remove(&mut self) -> Result<(), MapError> {
        let mut log = self.log.borrow_mut();
        let kind = log.markers[self.index].kind;
        if log.fail_remove_kinds.contains(&kind) {
            return Err(MapError::Marker(format!("{:?} element is detached", kind)));
        }
        log.markers[self.index].removed = true;
        Ok(())
    }

    fn on_render_error(&mut self, fallback: MarkerGlyph) {
        self.log.borrow_mut().markers[self.index].fallback = Some(fallback);
    }
}

impl MapSurface for MockMap {
    type Marker = MockMarker;

    fn has_source(&self, id: &str) -> bool {
        self.log.borrow().sources.contains_key(id)
    }

    fn add_geojson_source(&mut self, id: &str, data: &Feature) -> Result<(), MapError> {
        self.log.borrow_mut().sources.insert(id.to_string(), data.clone());
        Ok(())
    }

    fn set_source_data(&mut self, id: &str, data: &Feature) -> Result<(), MapError> {
        let mut log = self.log.borrow_mut();
        let source = log
            .sources
            .get_mut(id)
            .ok_or_else(|| MapError::MissingSource(id.to_string()))?;
        *source = data.clone();
        log.source_updates += 1;
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), MapError> {
        let mut log = self.log.borrow_mut();
        if log.fail_source_removal {
            return Err(MapError::Unavailable("style is loading".to_string()));
        }
        log.sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MapError::MissingSource(id.to_string()))
    }

    fn has_layer(&self, id: &str) -> bool {
        self.log.borrow().layers.iter().any(|layer| layer.id == id)
    }

    fn add_line_layer(&mut self, layer: &LineLayer) -> Result<(), MapError> {
        let mut log = self.log.borrow_mut();
        if !log.sources.contains_key(&layer.source) {
            return Err(MapError::MissingSource(layer.source.clone()));
        }
        log.layers.push(layer.clone());
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), MapError> {
        let mut log = self.log.borrow_mut();
        let before = log.layers.len();
        log.layers.retain(|layer| layer.id != id);
        if log.layers.len() == before {
            return Err(MapError::MissingLayer(id.to_string()));
        }
        Ok(())
    }

    fn add_marker(
        &mut self,
        kind: MarkerKind,
        glyph: &MarkerGlyph,
        at: GeoPoint,
    ) -> Result<MockMarker, MapError> {
        let mut log = self.log.borrow_mut();
        log.markers.push(MarkerRecord {
            kind,
            glyph: glyph.clone(),
            positions: vec![at],
            fallback: None,
            removed: false,
        });
        Ok(MockMarker {
            log: Rc::clone(&self.log),
            index: log.markers.len() - 1,
        })
    }

    fn viewport(&self) -> Option<ViewportBounds> {
        self.log.borrow().viewport
    }

    fn fly_to(&mut self, camera: CameraMove) {
        self.log.borrow_mut().fly_to.push(camera);
    }

    fn ease_to(&mut self, camera: CameraMove) {
        self.log.borrow_mut().ease_to.push(camera);
    }

    fn destroy(&mut self) {
        self.log.borrow_mut().destroy_calls += 1;
    }
}

#[derive(Debug, Default)]
pub struct FrameLog {
    next: u64,
    pub requested: Vec<FrameHandle>,
    pub cancelled: Vec<FrameHandle>,
}

impl FrameLog {
    pub fn last_requested(&self) -> FrameHandle {
        *self.requested.last().expect("a frame was requested")
    }
}

#[derive(Clone, Default)]
pub struct MockFrames {
    pub log: Rc<RefCell<FrameLog>>,
}

impl FrameScheduler for MockFrames {
    fn request_frame(&mut self) -> FrameHandle {
        let mut log = self.log.borrow_mut();
        log.next += 1;
        let handle = FrameHandle(log.next);
        log.requested.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.log.borrow_mut().cancelled.push(handle);
    }
}

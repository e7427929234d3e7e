//! Draws a ship-to-boatyard route on a map and sails the ship along it.
//!
//! The controller reacts to two inputs only: the tracked (start, end) pair and
//! the animate flag. Every new pair tears down what the previous one drew,
//! resolves a waterway route (or falls back to a straight segment), draws it
//! and restarts the ship animation.
//!
//! Hosts that cannot hold `&mut` across the route lookup use
//! [`RouteController::begin_track`] and [`RouteController::finish_track`]
//! around their own call to the router; results for a superseded pair are
//! dropped.

use serde::Deserialize;

use crate::animation::{progress, PathMeasure};
use crate::map::{
    CameraMove, FrameHandle, FrameScheduler, LineLayer, MapSurface, Marker, MarkerKind,
    MarkerStyles, RouteLineStyle,
};
use crate::error::MapError;
use crate::osm_fetcher::WaterwaySource;
use crate::router::{RouteOptions, WaterwayRouter};
use crate::types::{GeoPoint, Polyline};

pub const ROUTE_SOURCE_ID: &str = "ship-route";
pub const ROUTE_LAYER_ID: &str = "ship-route-line";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Camera center with nothing tracked.
    pub default_center: GeoPoint,
    pub default_zoom: f64,
    /// Zoom used when flying to a newly tracked point.
    pub focus_zoom: f64,
    pub fly_duration_ms: f64,
    /// Time for the ship to sail the whole route.
    pub animation_duration_ms: f64,
    /// Camera ease used when the ship leaves the viewport.
    pub recenter_duration_ms: f64,
    pub route: RouteOptions,
    pub line: RouteLineStyle,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            default_center: GeoPoint::new(106.70, 10.78),
            default_zoom: 10.0,
            focus_zoom: 13.0,
            fly_duration_ms: 1000.0,
            animation_duration_ms: 12_000.0,
            recenter_duration_ms: 600.0,
            route: RouteOptions::default(),
            line: RouteLineStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackedPair {
    pub start: Option<GeoPoint>,
    pub end: Option<GeoPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Resolving,
    Rendered,
    Animating,
    Unmounted,
}

/// A pending route lookup, valid until the tracked pair changes again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackRequest {
    generation: u64,
    pub start: GeoPoint,
    pub end: GeoPoint,
}

// One run of the ship from start to end. Owns at most one pending frame.
struct AnimationCycle {
    measure: PathMeasure,
    started_at: Option<f64>,
    pending: Option<FrameHandle>,
}

pub struct RouteController<M, F, S>
where
    M: MapSurface,
    F: FrameScheduler,
    S: WaterwaySource,
{
    map: M,
    frames: F,
    router: WaterwayRouter<S>,
    styles: MarkerStyles,
    config: ControllerConfig,
    state: ControllerState,
    pair: TrackedPair,
    generation: u64,
    animate: bool,
    route: Option<Polyline>,
    ship: Option<M::Marker>,
    boatyard: Option<M::Marker>,
    animation: Option<AnimationCycle>,
}

impl<M, F, S> RouteController<M, F, S>
where
    M: MapSurface,
    F: FrameScheduler,
    S: WaterwaySource,
{
    /// Takes ownership of a freshly created map and shows the default view.
    pub fn mount(
        mut map: M,
        frames: F,
        router: WaterwayRouter<S>,
        styles: MarkerStyles,
        config: ControllerConfig,
    ) -> Self {
        map.fly_to(CameraMove {
            center: config.default_center,
            zoom: Some(config.default_zoom),
            duration_ms: 0.0,
        });
        Self {
            map,
            frames,
            router,
            styles,
            config,
            state: ControllerState::Idle,
            pair: TrackedPair::default(),
            generation: 0,
            animate: true,
            route: None,
            ship: None,
            boatyard: None,
            animation: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn tracked_pair(&self) -> TrackedPair {
        self.pair
    }

    /// The line currently drawn, resolved or straight.
    pub fn route(&self) -> Option<&Polyline> {
        self.route.as_ref()
    }

    pub fn router(&self) -> &WaterwayRouter<S> {
        &self.router
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn animate(&self) -> bool {
        self.animate
    }

    /// Tracks a new pair: teardown, lookup, draw, animate.
    pub async fn track(&mut self, start: Option<GeoPoint>, end: Option<GeoPoint>) {
        let Some(request) = self.begin_track(start, end) else {
            return;
        };
        let route = self
            .router
            .resolve_route(request.start, request.end, &self.config.route)
            .await;
        self.finish_track(request, route);
    }

    /// First half of [`track`](Self::track).
    ///
    /// Returns the lookup to perform when both points are present. With one
    /// point the marker is drawn right away; with none the default view returns.
    pub fn begin_track(
        &mut self,
        start: Option<GeoPoint>,
        end: Option<GeoPoint>,
    ) -> Option<TrackRequest> {
        if self.state == ControllerState::Unmounted {
            return None;
        }
        let pair = TrackedPair { start, end };
        if pair == self.pair {
            return None;
        }

        self.pair = pair;
        self.generation += 1;
        self.teardown();

        let Some(focus) = start.or(end) else {
            self.show_default_view();
            self.state = ControllerState::Idle;
            return None;
        };
        self.map.fly_to(CameraMove {
            center: focus,
            zoom: Some(self.config.focus_zoom),
            duration_ms: self.config.fly_duration_ms,
        });
        self.state = ControllerState::Resolving;

        match (start, end) {
            (Some(start), Some(end)) => Some(TrackRequest {
                generation: self.generation,
                start,
                end,
            }),
            _ => {
                self.render(None);
                None
            }
        }
    }

    /// Second half of [`track`](Self::track). Falls back to a straight line
    /// when `route` is missing or too short.
    pub fn finish_track(&mut self, request: TrackRequest, route: Option<Polyline>) {
        if request.generation != self.generation || self.state != ControllerState::Resolving {
            log::debug!("Dropping route for a superseded pair");
            return;
        }
        let polyline = match route {
            Some(route) if route.len() >= 2 => route,
            _ => {
                log::info!("No waterway route, drawing a straight line");
                Polyline::straight(request.start, request.end)
            }
        };
        self.render(Some(polyline));
    }

    pub fn set_animate(&mut self, enabled: bool) {
        if self.animate == enabled {
            return;
        }
        self.animate = enabled;
        if enabled {
            if self.state == ControllerState::Rendered {
                self.start_animation();
            }
        } else {
            self.cancel_animation();
        }
    }

    /// Advances the ship. Frames other than the one currently pending are ignored.
    pub fn on_frame(&mut self, handle: FrameHandle, timestamp_ms: f64) {
        let Some(cycle) = self.animation.as_mut() else {
            log::debug!("Ignoring frame {:?}: no animation running", handle);
            return;
        };
        if cycle.pending != Some(handle) {
            log::debug!("Ignoring stale frame {:?}", handle);
            return;
        }
        cycle.pending = None;

        let started_at = *cycle.started_at.get_or_insert(timestamp_ms);
        let t = progress(timestamp_ms - started_at, self.config.animation_duration_ms);
        let position = cycle.measure.point_at(t);

        if let Some(position) = position {
            self.move_ship(position);
        }

        if t < 1.0 {
            let next = self.frames.request_frame();
            if let Some(cycle) = self.animation.as_mut() {
                cycle.pending = Some(next);
            }
        } else {
            self.animation = None;
            self.state = ControllerState::Rendered;
        }
    }

    /// Removes everything from the map and destroys it. Safe to call again.
    pub fn unmount(&mut self) {
        if self.state == ControllerState::Unmounted {
            return;
        }
        self.generation += 1;
        self.teardown();
        self.map.destroy();
        self.state = ControllerState::Unmounted;
    }

    fn show_default_view(&mut self) {
        self.map.fly_to(CameraMove {
            center: self.config.default_center,
            zoom: Some(self.config.default_zoom),
            duration_ms: self.config.fly_duration_ms,
        });
    }

    fn render(&mut self, polyline: Option<Polyline>) {
        if let Some(polyline) = &polyline {
            if let Err(e) = self.upsert_route_line(polyline) {
                log::warn!("Could not draw route line: {}", e);
            }
        }
        self.route = polyline;

        if let Some(end) = self.pair.end {
            self.boatyard = self.place_marker(MarkerKind::Boatyard, end);
        }
        if let Some(start) = self.pair.start {
            self.ship = self.place_marker(MarkerKind::Ship, start);
        }
        self.state = ControllerState::Rendered;
        self.start_animation();
    }

    fn upsert_route_line(&mut self, polyline: &Polyline) -> Result<(), MapError> {
        let data = polyline.to_geojson();
        if self.map.has_source(ROUTE_SOURCE_ID) {
            self.map.set_source_data(ROUTE_SOURCE_ID, &data)?;
        } else {
            self.map.add_geojson_source(ROUTE_SOURCE_ID, &data)?;
        }
        if !self.map.has_layer(ROUTE_LAYER_ID) {
            self.map.add_line_layer(&LineLayer {
                id: ROUTE_LAYER_ID.to_string(),
                source: ROUTE_SOURCE_ID.to_string(),
                style: self.config.line.clone(),
            })?;
        }
        Ok(())
    }

    fn place_marker(&mut self, kind: MarkerKind, at: GeoPoint) -> Option<M::Marker> {
        let style = self.styles.for_kind(kind);
        match self.map.add_marker(kind, &style.glyph, at) {
            Ok(mut marker) => {
                if let Some(fallback) = &style.fallback {
                    marker.on_render_error(fallback.clone());
                }
                Some(marker)
            }
            Err(e) => {
                log::warn!("Could not place {:?} marker: {}", kind, e);
                None
            }
        }
    }

    fn start_animation(&mut self) {
        self.cancel_animation();
        if !self.animate || self.pair.start.is_none() || self.pair.end.is_none() || self.ship.is_none() {
            return;
        }
        let Some(route) = &self.route else {
            return;
        };
        let measure = PathMeasure::new(route);
        let handle = self.frames.request_frame();
        self.animation = Some(AnimationCycle {
            measure,
            started_at: None,
            pending: Some(handle),
        });
        self.state = ControllerState::Animating;
    }

    fn cancel_animation(&mut self) {
        if let Some(cycle) = self.animation.take() {
            if let Some(handle) = cycle.pending {
                self.frames.cancel_frame(handle);
            }
        }
        if self.state == ControllerState::Animating {
            self.state = ControllerState::Rendered;
        }
    }

    fn move_ship(&mut self, position: GeoPoint) {
        if let Some(ship) = self.ship.as_mut() {
            if let Err(e) = ship.set_position(position) {
                log::warn!("Could not move ship marker: {}", e);
            }
        }
        if let Some(bounds) = self.map.viewport() {
            if !bounds.contains(&position) {
                self.map.ease_to(CameraMove {
                    center: position,
                    zoom: None,
                    duration_ms: self.config.recenter_duration_ms,
                });
            }
        }
    }

    // Each step may fail on its own; none of them stops the others.
    fn teardown(&mut self) {
        self.cancel_animation();
        if let Err(e) = self.map.remove_layer(ROUTE_LAYER_ID) {
            log::debug!("Route layer not removed: {}", e);
        }
        if let Err(e) = self.map.remove_source(ROUTE_SOURCE_ID) {
            log::debug!("Route source not removed: {}", e);
        }
        for (kind, marker) in [
            (MarkerKind::Ship, self.ship.take()),
            (MarkerKind::Boatyard, self.boatyard.take()),
        ] {
            if let Some(mut marker) = marker {
                if let Err(e) = marker.remove() {
                    log::warn!("Could not remove {:?} marker: {}", kind, e);
                }
            }
        }
        self.route = None;
    }
}

impl<M, F, S> Drop for RouteController<M, F, S>
where
    M: MapSurface,
    F: FrameScheduler,
    S: WaterwaySource,
{
    fn drop(&mut self) {
        self.unmount();
    }
}

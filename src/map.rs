//! What the route controller needs from a map engine.
//!
//! Hosts implement these traits over their renderer (for instance a
//! MapLibre instance reached through wasm-bindgen).

use geo::{Intersects, Rect};
use geojson::Feature;
use serde::Deserialize;

use crate::error::MapError;
use crate::types::GeoPoint;

/// Visible area of the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportBounds {
    rect: Rect<f64>,
}

impl ViewportBounds {
    pub fn new(south_west: GeoPoint, north_east: GeoPoint) -> Self {
        Self {
            rect: Rect::new(south_west, north_east),
        }
    }

    /// Edges count as inside.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.rect.intersects(&geo::Coord::from(*point))
    }
}

/// Camera target for `fly_to` and `ease_to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMove {
    pub center: GeoPoint,
    /// Keep the current zoom when `None`.
    pub zoom: Option<f64>,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouteLineStyle {
    pub color: String,
    pub width: f64,
}

impl Default for RouteLineStyle {
    fn default() -> Self {
        Self {
            color: "#1e88e5".to_string(),
            width: 4.0,
        }
    }
}

/// A line layer drawn from a GeoJSON source.
#[derive(Debug, Clone, PartialEq)]
pub struct LineLayer {
    pub id: String,
    pub source: String,
    pub style: RouteLineStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// The moving vessel, placed at the start point.
    Ship,
    /// The destination dock, placed at the end point.
    Boatyard,
}

/// How a marker is drawn.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerGlyph {
    Image { url: String, size_px: u32 },
    Vector { svg: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarkerStyle {
    pub glyph: MarkerGlyph,
    /// Swapped in when `glyph` fails to render.
    #[serde(default)]
    pub fallback: Option<MarkerGlyph>,
}

/// Marker visuals supplied by the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarkerStyles {
    pub ship: MarkerStyle,
    pub boatyard: MarkerStyle,
}

impl MarkerStyles {
    pub fn for_kind(&self, kind: MarkerKind) -> &MarkerStyle {
        match kind {
            MarkerKind::Ship => &self.ship,
            MarkerKind::Boatyard => &self.boatyard,
        }
    }
}

impl Default for MarkerStyles {
    fn default() -> Self {
        Self {
            ship: MarkerStyle {
                glyph: MarkerGlyph::Image {
                    url: "/images/ship.png".to_string(),
                    size_px: 40,
                },
                fallback: Some(MarkerGlyph::Vector {
                    svg: r##"<svg viewBox="0 0 24 24"><path d="M3 17l9-13 9 13z" fill="#1e88e5"/></svg>"##.to_string(),
                }),
            },
            boatyard: MarkerStyle {
                glyph: MarkerGlyph::Image {
                    url: "/images/boatyard.png".to_string(),
                    size_px: 36,
                },
                fallback: Some(MarkerGlyph::Vector {
                    svg: r##"<svg viewBox="0 0 24 24"><circle cx="12" cy="12" r="9" fill="#e53935"/></svg>"##.to_string(),
                }),
            },
        }
    }
}

/// A marker placed on the map.
pub trait Marker {
    fn set_position(&mut self, at: GeoPoint) -> Result<(), MapError>;

    fn remove(&mut self) -> Result<(), MapError>;

    /// Glyph to switch to if the primary one cannot be rendered.
    fn on_render_error(&mut self, fallback: MarkerGlyph);
}

/// The map engine.
pub trait MapSurface {
    type Marker: Marker;

    fn has_source(&self, id: &str) -> bool;

    fn add_geojson_source(&mut self, id: &str, data: &Feature) -> Result<(), MapError>;

    /// Replaces the data of an existing source in place.
    fn set_source_data(&mut self, id: &str, data: &Feature) -> Result<(), MapError>;

    fn remove_source(&mut self, id: &str) -> Result<(), MapError>;

    fn has_layer(&self, id: &str) -> bool;

    fn add_line_layer(&mut self, layer: &LineLayer) -> Result<(), MapError>;

    fn remove_layer(&mut self, id: &str) -> Result<(), MapError>;

    fn add_marker(
        &mut self,
        kind: MarkerKind,
        glyph: &MarkerGlyph,
        at: GeoPoint,
    ) -> Result<Self::Marker, MapError>;

    /// `None` while the map has no size yet.
    fn viewport(&self) -> Option<ViewportBounds>;

    fn fly_to(&mut self, camera: CameraMove);

    fn ease_to(&mut self, camera: CameraMove);

    /// Releases the map and its container binding.
    fn destroy(&mut self);
}

/// Identifies one scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// The host's display-frame pacing (e.g. `requestAnimationFrame`).
///
/// When a requested frame fires, the host calls
/// [`RouteController::on_frame`](crate::controller::RouteController::on_frame)
/// with the handle and the frame timestamp.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;

    fn cancel_frame(&mut self, handle: FrameHandle);
}

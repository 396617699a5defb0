//! Bounding boxes.
//!
//! The detection service reports boxes in two shapes: corner pairs
//! (`xMin`/`yMin`/`xMax`/`yMax`, sometimes lowercase) and origin + size
//! (`x`/`y`/`width`/`height`). Both deserialize into [`BoundingBox`] and are
//! normalized into a [`Rect`] before anything renders them.

use serde::{Deserialize, Serialize};

/// Canonical box shape: top-left origin plus extent, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Bottom-right corner.
    pub fn far_corner(&self) -> (f64, f64) {
        (self.x + self.width, self.y + self.height)
    }
}

/// A box exactly as the service sent it, after missing fields defaulted to 0.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "RawBox")]
pub enum BoundingBox {
    Corners {
        x_min: f64,
        y_min: f64,
        x_max: f64,
        y_max: f64,
    },
    Origin {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

impl BoundingBox {
    /// Normalize into a [`Rect`]. Negative extents clamp to zero.
    pub fn normalize(&self) -> Rect {
        match *self {
            BoundingBox::Corners {
                x_min,
                y_min,
                x_max,
                y_max,
            } => Rect {
                x: x_min,
                y: y_min,
                width: (x_max - x_min).max(0.0),
                height: (y_max - y_min).max(0.0),
            },
            BoundingBox::Origin {
                x,
                y,
                width,
                height,
            } => Rect {
                x,
                y,
                width: width.max(0.0),
                height: height.max(0.0),
            },
        }
    }
}

/// Normalize either box representation into `{x, y, width, height}`.
pub fn normalize_bounding_box(bbox: &BoundingBox) -> Rect {
    bbox.normalize()
}

/// Union of every key either shape may carry.
#[derive(Debug, Default, Deserialize)]
struct RawBox {
    #[serde(rename = "xMin", alias = "xmin", alias = "x_min")]
    x_min: Option<f64>,
    #[serde(rename = "yMin", alias = "ymin", alias = "y_min")]
    y_min: Option<f64>,
    #[serde(rename = "xMax", alias = "xmax", alias = "x_max")]
    x_max: Option<f64>,
    #[serde(rename = "yMax", alias = "ymax", alias = "y_max")]
    y_max: Option<f64>,
    x: Option<f64>,
    y: Option<f64>,
    width: Option<f64>,
    height: Option<f64>,
}

impl From<RawBox> for BoundingBox {
    fn from(raw: RawBox) -> Self {
        let has_corner = raw.x_min.is_some()
            || raw.y_min.is_some()
            || raw.x_max.is_some()
            || raw.y_max.is_some();

        if has_corner {
            BoundingBox::Corners {
                x_min: raw.x_min.unwrap_or(0.0),
                y_min: raw.y_min.unwrap_or(0.0),
                x_max: raw.x_max.unwrap_or(0.0),
                y_max: raw.y_max.unwrap_or(0.0),
            }
        } else {
            BoundingBox::Origin {
                x: raw.x.unwrap_or(0.0),
                y: raw.y.unwrap_or(0.0),
                width: raw.width.unwrap_or(0.0),
                height: raw.height.unwrap_or(0.0),
            }
        }
    }
}

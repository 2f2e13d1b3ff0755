// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Projection support for imagery rectangles.
//!
//! The target scene addresses imagery by geographic rectangles in degrees.
//! Layer extents are expressed in the view projection of the map, so they
//! are converted here.

use kurbo::{Point, Rect};
use tandem_core::map::Projection;

/// Spherical Mercator radius, in meters.
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Returns whether the target can display imagery served in `projection`.
#[must_use]
pub fn is_supported(projection: Projection) -> bool {
    matches!(projection, Projection::WebMercator | Projection::Geographic)
}

/// Converts a point from `projection` to longitude/latitude in degrees.
///
/// Returns `None` for unsupported projections.
#[must_use]
pub fn to_lon_lat(point: Point, projection: Projection) -> Option<Point> {
    match projection {
        Projection::Geographic => Some(point),
        Projection::WebMercator => {
            let lon = (point.x / EARTH_RADIUS).to_degrees();
            let lat = (2.0 * (point.y / EARTH_RADIUS).exp().atan() - core::f64::consts::FRAC_PI_2)
                .to_degrees();
            Some(Point::new(lon, lat))
        }
        Projection::Other(_) => None,
    }
}

/// Converts an extent in `projection` to a degree rectangle.
///
/// Returns `None` for unsupported projections.
#[must_use]
pub fn to_degrees(extent: Rect, projection: Projection) -> Option<Rect> {
    let min = to_lon_lat(Point::new(extent.x0, extent.y0), projection)?;
    let max = to_lon_lat(Point::new(extent.x1, extent.y1), projection)?;
    Some(Rect::from_points(min, max))
}

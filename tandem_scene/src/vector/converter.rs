// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Feature to primitive conversion.

use kurbo::Point;
use tandem_core::lineage::LayerWithParents;
use tandem_core::map::{FeatureId, Geometry, MapTree};

/// A renderable shape for one feature.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    /// A screen-aligned marker.
    Billboard(Point),
    /// An open polyline.
    Polyline(Vec<Point>),
    /// A filled polygon.
    Polygon(Vec<Point>),
}

/// Turns a feature into a primitive.
///
/// Styling and geometry simplification live behind this trait. Returning
/// `None` skips the feature; it is converted again when it changes.
pub trait FeatureConverter {
    /// Converts one feature of `layer`'s source.
    fn convert(
        &mut self,
        tree: &MapTree,
        layer: &LayerWithParents,
        feature: FeatureId,
        geometry: &Geometry,
    ) -> Option<Primitive>;
}

/// Maps each geometry to the matching primitive shape, unstyled.
///
/// Points become billboards, line strings polylines, and polygons with at
/// least three vertices filled polygons.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeometryConverter;

impl FeatureConverter for GeometryConverter {
    fn convert(
        &mut self,
        _tree: &MapTree,
        _layer: &LayerWithParents,
        _feature: FeatureId,
        geometry: &Geometry,
    ) -> Option<Primitive> {
        match geometry {
            Geometry::Point(p) => Some(Primitive::Billboard(*p)),
            Geometry::LineString(points) if points.len() >= 2 => {
                Some(Primitive::Polyline(points.clone()))
            }
            Geometry::Polygon(ring) if ring.len() >= 3 => Some(Primitive::Polygon(ring.clone())),
            _ => None,
        }
    }
}

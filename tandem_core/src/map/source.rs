// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data sources and features.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Point;

use super::id::{FeatureId, SourceId};

/// Coordinate reference system of a source or view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Projection {
    /// Spherical Web Mercator (EPSG:3857), in meters.
    WebMercator,
    /// Geographic longitude/latitude (EPSG:4326), in degrees.
    Geographic,
    /// Any other projection, identified by its EPSG code.
    Other(u32),
}

/// Loading state of a source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SourceState {
    /// Still being configured or fetched.
    #[default]
    Loading,
    /// Usable.
    Ready,
    /// Failed permanently.
    Error,
}

/// A tiled or single-image raster source.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterSource {
    /// URL template the imagery provider fetches from.
    pub url: String,
    /// Projection of the served imagery; `None` means "same as the view".
    pub projection: Option<Projection>,
    /// Loading state.
    pub state: SourceState,
}

impl RasterSource {
    /// Creates a ready raster source in the view projection.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            projection: None,
            state: SourceState::Ready,
        }
    }

    /// Returns the source with an explicit projection.
    #[must_use]
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Returns the source with the given loading state.
    #[must_use]
    pub fn with_state(mut self, state: SourceState) -> Self {
        self.state = state;
        self
    }
}

/// An ordered set of vector features.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureSource {
    pub(crate) features: Vec<FeatureId>,
}

impl FeatureSource {
    /// Returns the features in insertion order.
    #[must_use]
    pub fn features(&self) -> &[FeatureId] {
        &self.features
    }
}

/// A data source attached to a leaf layer.
#[derive(Clone, Debug, PartialEq)]
pub enum Source {
    /// Raster imagery.
    Raster(RasterSource),
    /// Vector features.
    Features(FeatureSource),
    /// A clustering wrapper around another (feature) source.
    Cluster {
        /// The wrapped source.
        inner: SourceId,
    },
}

/// Geometry of a feature, in map coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// A single position.
    Point(Point),
    /// An open polyline.
    LineString(Vec<Point>),
    /// A closed exterior ring.
    Polygon(Vec<Point>),
}

/// Storage record for one feature.
#[derive(Clone, Debug)]
pub(crate) struct FeatureSlot {
    pub(crate) owner: SourceId,
    pub(crate) geometry: Geometry,
    pub(crate) generation: u32,
    pub(crate) alive: bool,
}

// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Imagery layer synchronization.
//!
//! Tile and image leaves become [`ImageryLayer`]s in an
//! [`ImageryLayerCollection`] whose bottom-to-top order mirrors the map's
//! effective stacking order. Inherited visibility and opacity become the
//! layer's `show` and `alpha`.

mod collection;
mod factory;

pub use collection::{ImageryLayer, ImageryLayerCollection, ImageryLayerId, ImageryProvider};
pub use factory::{ImageryConfig, ImageryFactory, ImageryHook};

use tandem_core::sync::Synchronizer;

/// Synchronizes a map subtree into an [`ImageryLayerCollection`].
pub type ImagerySynchronizer = Synchronizer<ImageryFactory>;

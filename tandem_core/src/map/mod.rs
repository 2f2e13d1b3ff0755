// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The source map layer tree.
//!
//! A [`MapTree`] holds groups and leaf layers in struct-of-arrays storage.
//! Groups own their children through a first-class child collection
//! ([`CollectionId`]) which can be swapped for another collection at any
//! time. Leaves may reference a data [`Source`]: raster imagery, a vector
//! [`FeatureSource`], or a cluster wrapping one.
//!
//! All mutations go through `MapTree` methods and emit
//! [`TreeEvent`](crate::event::TreeEvent)s on the tree's
//! [`EventBus`](crate::event::EventBus).

mod id;
mod source;
mod traverse;
mod tree;

pub use id::{CollectionId, FeatureId, NodeId, SourceId};
pub use source::{FeatureSource, Geometry, Projection, RasterSource, Source, SourceState};
pub use traverse::DocumentOrder;
pub use tree::{LeafKind, MapTree, NodeKind};

// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene collections and the counterpart factories that fill them.
//!
//! Two synchronizers are provided on top of [`tandem_core::sync`]:
//!
//! - [`ImagerySynchronizer`](imagery::ImagerySynchronizer) turns tile and
//!   image leaves into an ordered [`ImageryLayerCollection`](imagery::ImageryLayerCollection).
//! - [`VectorSynchronizer`](vector::VectorSynchronizer) turns vector leaves
//!   into per-layer primitive sets in a [`PrimitiveCollection`](vector::PrimitiveCollection).
//!
//! Both may run against the same [`MapTree`](tandem_core::map::MapTree);
//! each gets its own event subscriber.
//!
//! Collections record what changed in [`dirty`] channels, so a render loop
//! can pick up only the touched slots with `take_changes`.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Forwards to `tandem_core/trace`.

pub mod dirty;
pub mod imagery;
pub mod projection;
pub mod vector;

pub use dirty::SceneChanges;
pub use imagery::{ImageryFactory, ImagerySynchronizer};
pub use vector::{VectorFactory, VectorSynchronizer};

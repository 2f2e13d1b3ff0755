// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Map layer tree and counterpart synchronization.
//!
//! `tandem_core` keeps a target scene's object set consistent with a
//! mutable, hierarchical 2D map layer tree. As layers are added, removed,
//! reordered, or reparented, a [`Synchronizer`](sync::Synchronizer) creates,
//! destroys, and re-sequences *counterpart* objects through a pluggable
//! [`CounterpartFactory`](sync::CounterpartFactory). It is `no_std`
//! compatible (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   host mutates MapTree ──► EventBus queues Deliveries per subscriber
//!                                        │
//!                 ┌──────────────────────┘
//!                 ▼
//!   Synchronizer::process() ──► add_layers / remove_layer / retry
//!                                        │
//!                 ┌──────────────────────┘
//!                 ▼
//!   CounterpartFactory (create / add / remove / destroy / order_layers)
//!                                        │
//!                                        ▼
//!                    target collection, read by the render loop
//! ```
//!
//! **[`map`]**: Struct-of-arrays layer tree with generational handles,
//! first-class child collections, raster and feature sources.
//!
//! **[`event`]**: Topics, tree events, and the [`EventBus`](event::EventBus)
//! that turns tree mutations into per-subscriber deliveries.
//!
//! **[`lineage`]**: [`LayerWithParents`](lineage::LayerWithParents): a node
//! and its ancestor chain, used for inherited visibility and opacity.
//!
//! **[`sync`]**: The generic engine, its listener registry, the
//! per-node state machine, and the stacking-order strategy.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! synchronization diagnostics, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod error;
pub mod event;
pub mod lineage;
pub mod map;
pub mod sync;
pub mod trace;

// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scripted map session that exercises both synchronizers and the tracing
//! pipeline.
//!
//! A small layer tree is edited in a fixed sequence of steps. After each step
//! both synchronizers process their deliveries, their reports are forwarded to
//! a [`PrettyPrintSink`](tandem_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](tandem_debug::recorder::RecorderSink), and the scene
//! changes are printed. At the end a Chrome trace JSON file is written.

use std::fs::File;
use std::io::BufWriter;

use kurbo::{Point, Rect};
use tandem_core::map::{Geometry, LeafKind, MapTree, RasterSource, SourceState};
use tandem_core::sync::{SyncConfig, SyncReport, Synchronizer};
use tandem_core::trace::Tracer;
use tandem_debug::pretty::PrettyPrintSink;
use tandem_debug::recorder::RecorderSink;
use tandem_scene::imagery::{ImageryFactory, ImagerySynchronizer};
use tandem_scene::vector::{VectorFactory, VectorSynchronizer};

struct Session {
    tree: MapTree,
    imagery: ImagerySynchronizer,
    vector: VectorSynchronizer,
    pretty: PrettyPrintSink,
    recorder: RecorderSink,
    sequence: u64,
}

impl Session {
    fn trace(&mut self, report: &SyncReport) {
        Tracer::new(&mut self.pretty).report(self.sequence, report);
        Tracer::new(&mut self.recorder).report(self.sequence, report);
    }

    /// Processes pending deliveries and prints what changed.
    fn step(&mut self, label: &str) {
        self.sequence += 1;
        println!("-- {}: {label}", self.sequence);
        if let Err(err) = self.imagery.process(&mut self.tree) {
            println!("   imagery: {err}");
        }
        if let Err(err) = self.vector.process(&mut self.tree) {
            println!("   vector: {err}");
        }
        self.flush();
    }

    fn flush(&mut self) {
        let report = self.imagery.take_report();
        self.trace(&report);
        let report = self.vector.take_report();
        self.trace(&report);

        let layers = self.imagery.factory_mut().layers_mut();
        let changes = layers.take_changes();
        if !changes.is_empty() {
            println!("   imagery changes: {changes:?}");
        }
        let order: Vec<&str> = layers
            .layers()
            .iter()
            .map(|&id| layers.get(id).provider.url.as_str())
            .collect();
        println!("   imagery order: {order:?}");

        let changes = self.vector.factory_mut().primitives_mut().take_changes();
        if !changes.is_empty() {
            println!("   vector changes: {changes:?}");
        }
    }
}

fn main() {
    let mut tree = MapTree::new();
    let root = tree.create_group();

    let osm = tree.create_raster_source(RasterSource::new("osm/{z}/{x}/{y}.png"));
    let basemap = tree.create_layer_with_source(LeafKind::Tile, osm);
    tree.add_to_group(root, basemap);

    let overlays = tree.create_group();
    tree.add_to_group(root, overlays);
    let radar_source = tree.create_raster_source(
        RasterSource::new("radar/latest.png").with_state(SourceState::Loading),
    );
    let radar = tree.create_layer_with_source(LeafKind::Image, radar_source);
    tree.set_extent(
        radar,
        Some(Rect::new(-1_113_194.9, 5_012_341.7, 2_226_389.8, 7_361_866.1)),
    );
    tree.add_to_group(overlays, radar);

    let stations = tree.create_feature_source();
    for (x, y) in [(2.35, 48.85), (13.40, 52.52), (-0.12, 51.50)] {
        tree.add_feature(stations, Geometry::Point(Point::new(x, y)));
    }
    let clustered = tree.create_cluster_source(stations);
    let markers = tree.create_layer_with_source(LeafKind::Vector, clustered);
    tree.add_to_group(overlays, markers);

    let mut imagery = Synchronizer::new(
        &mut tree,
        root,
        ImageryFactory::default(),
        SyncConfig::DEFAULT,
    );
    let mut vector = Synchronizer::new(
        &mut tree,
        root,
        VectorFactory::default(),
        SyncConfig::DEFAULT,
    );
    if let Err(err) = imagery.synchronize(&mut tree) {
        println!("imagery: {err}");
    }
    if let Err(err) = vector.synchronize(&mut tree) {
        println!("vector: {err}");
    }

    let mut session = Session {
        tree,
        imagery,
        vector,
        pretty: PrettyPrintSink::new(Box::new(std::io::stdout())),
        recorder: RecorderSink::new(),
        sequence: 0,
    };
    println!("-- 0: initial synchronization");
    session.flush();

    session.tree.set_source_state(radar_source, SourceState::Ready);
    session.step("radar source ready");

    session.tree.set_z_index(basemap, Some(10.0));
    session.step("basemap raised");

    session.tree.set_opacity(overlays, 0.6);
    let lisbon = session
        .tree
        .add_feature(stations, Geometry::Point(Point::new(-9.14, 38.72)));
    session.step("overlays faded, station added");

    session
        .tree
        .set_geometry(lisbon, Geometry::Point(Point::new(-9.13, 38.71)));
    session.tree.set_visible(overlays, false);
    session.step("station moved, overlays hidden");

    let extra = session.tree.create_layer_with_source(LeafKind::Tile, osm);
    session.tree.add_to_group(overlays, extra);
    session.tree.remove_from_group(root, overlays);
    session.step("overlay group detached");

    session.imagery.destroy_all(&mut session.tree);
    session.vector.destroy_all(&mut session.tree);
    session.sequence += 1;
    println!("-- {}: teardown", session.sequence);
    session.flush();

    let path = "sync-trace.json";
    let file = match File::create(path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("failed to create {path}: {err}");
            return;
        }
    };
    let mut writer = BufWriter::new(file);
    if let Err(err) = tandem_debug::chrome::export(session.recorder.as_bytes(), &mut writer) {
        eprintln!("failed to write Chrome trace: {err}");
        return;
    }
    println!("Wrote {path} ({} passes)", session.sequence);
}

//! # UCNSIM-RS
//!
//! Demo run: UCN stored in a vertical steel guide closed at both ends, with a
//! detector resting on the bottom.
//!
//! Usage: `ucnsim [config.json] [wall-material]`. The wall material is a
//! library id such as `beryllium` (default `stainless_steel`); pass `-` as the
//! config to keep the built-in run. Verbosity is
//! controlled by `RUST_LOG`.

use std::process::ExitCode;

use log::error;

use ucnsim_rs::geometry::{BoundaryTime, GeometryBuilder, GeometryTree, NodeId, Shape, Transform};
use ucnsim_rs::materials::{get_material, ALL_MATERIALS, BLACK_HOLE, DETECTOR_WINDOW, VACUUM};
use ucnsim_rs::simulator::VolumeSource;
use ucnsim_rs::*;

/// Guide radius (m)
const GUIDE_RADIUS: f64 = 4.0 * CM;
/// Guide half-length (m)
const GUIDE_HALF_LENGTH: f64 = 50.0 * CM;
const WALL_THICKNESS: f64 = 0.5 * CM;
/// Maximum source energy (eV)
const SOURCE_ENERGY: f64 = 180.0 * NEV;

fn demo_geometry(wall_material: Material) -> Result<(GeometryTree, NodeId), GeometryError> {
    let mut b = GeometryBuilder::new();
    let world = b.world("world", Shape::cuboid(1.0, 1.0, 1.0), BLACK_HOLE)?;
    let wall = b.place(
        world,
        "guide_wall",
        Shape::tube(0.0, GUIDE_RADIUS + WALL_THICKNESS, GUIDE_HALF_LENGTH + WALL_THICKNESS),
        wall_material,
        Transform::identity(),
    )?;
    let bore = b.place(
        wall,
        "bore",
        Shape::tube(0.0, GUIDE_RADIUS, GUIDE_HALF_LENGTH),
        VACUUM,
        Transform::identity(),
    )?;
    b.place(
        bore,
        "detector",
        Shape::cuboid(2.5 * CM, 2.5 * CM, 0.5 * CM),
        DETECTOR_WINDOW,
        Transform::translation(0.0, 0.0, -GUIDE_HALF_LENGTH + 0.6 * CM),
    )?;
    Ok((b.build()?, bore))
}

fn main() -> ExitCode {
    env_logger::init();

    println!("{}", info());
    println!();

    let args: Vec<String> = std::env::args().collect();

    let config = match args.get(1).filter(|a| a.as_str() != "-") {
        Some(path) => match RunConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => RunConfig {
            run_name: "steel-guide".to_string(),
            run_time: 100.0,
            n_particles: 1000,
            parallel: true,
            ..RunConfig::default()
        },
    };

    let wall_id = args.get(2).map(String::as_str).unwrap_or("stainless_steel");
    let wall_material = match get_material(wall_id) {
        Some(m) if m.kind == MaterialKind::Boundary => *m,
        _ => {
            let ids: Vec<&str> = ALL_MATERIALS
                .iter()
                .filter(|m| m.kind == MaterialKind::Boundary)
                .map(|m| m.id)
                .collect();
            error!("unknown wall material '{}', expected one of: {}", wall_id, ids.join(", "));
            return ExitCode::FAILURE;
        }
    };

    let (tree, bore) = match demo_geometry(wall_material) {
        Ok(g) => g,
        Err(e) => {
            error!("geometry: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let run = match Run::new(&tree, config) {
        Ok(r) => r,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Geometry:");
    for id in tree.ids() {
        let node = tree.node(id);
        println!("  {:<32} {:<20} {}", tree.path(id), node.material.name, node.shape.name());
    }
    println!();

    println!("Running {} particles for {:.1} s...", run.config().n_particles, run.config().run_time);
    let start = std::time::Instant::now();
    let batch = run.run_batch(&VolumeSource::new(bore, SOURCE_ENERGY));
    let elapsed = start.elapsed();

    println!();
    println!("{}", batch.stats.summary());
    println!("Wall-clock time: {:.3} s", elapsed.as_secs_f64());
    println!(
        "Performance: {:.2e} bounces/s",
        (batch.stats.specular_bounces + batch.stats.diffuse_bounces) as f64 / elapsed.as_secs_f64()
    );

    if let Some(first) = batch.particles.first() {
        let (p, track) = run.trace(first);
        println!(
            "UCN {} replayed: {} ({} track points, {:.3} m travelled)",
            p.id,
            p.state,
            track.points.len(),
            p.distance
        );
    }
    ExitCode::SUCCESS
}

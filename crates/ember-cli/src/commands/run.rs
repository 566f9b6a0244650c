//! Headless simulation command

use std::path::Path;

use anyhow::{bail, Result};
use ember_actor::ActorWorld;
use ember_core::{Facing, Vec3};
use ember_particles::{ParticleEngine, SimParams, SpawnRequest};
use ember_template::TemplateRegistry;
use ember_terrain::{Heightmap, MeshConfig, TerrainMesh, Water};

pub struct RunArgs {
    pub template: String,
    pub templates: String,
    pub count: u32,
    pub ticks: u32,
    pub capacity: usize,
    pub seed: Option<u32>,
    pub heightmap: Option<String>,
    pub water_level: Option<f32>,
    pub format: String,
}

pub fn run(args: RunArgs) -> Result<()> {
    let mut registry = TemplateRegistry::new();
    registry.load_dir(Path::new(&args.templates))?;

    let Some(template) = registry.id_by_name(&args.template) else {
        bail!("unknown template '{}'", args.template);
    };

    let mut terrain = match &args.heightmap {
        Some(path) => {
            let heightmap = Heightmap::from_png(Path::new(path))?;
            TerrainMesh::from_heightmap(&heightmap, &MeshConfig::default())
        }
        None => TerrainMesh::flat(32, 32, 0.0),
    };
    if let Some(surface_level) = args.water_level {
        terrain.water = Water {
            is_water: true,
            surface_level,
        };
    }

    let mut params = SimParams::default();
    params.capacity = args.capacity;
    if let Some(seed) = args.seed {
        params.seed = seed;
    }

    let mut actors = ActorWorld::new();
    let mut engine = ParticleEngine::new(params, registry);

    // fan the burst out from the arena center
    let cx = terrain.edge_x() / 2.0;
    let cy = terrain.edge_y() / 2.0;
    let center = Vec3::new(cx, cy, terrain.floor_level(cx, cy) + 40.0);
    let step = 65536 / args.count.max(1);

    let mut granted = 0;
    for i in 0..args.count {
        let req = SpawnRequest::new(template, center).facing(Facing((i * step) as u16));
        if engine.spawn(&terrain, &mut actors, req).is_some() {
            granted += 1;
        }
    }

    let text = args.format != "json";
    if text {
        println!(
            "Spawned {} of '{}' at the arena center",
            granted, args.template
        );
    }

    let mut sound_count = 0usize;
    let report_every = (args.ticks / 10).max(1);
    for tick in 1..=args.ticks {
        engine.update_all(1.0, &terrain, &mut actors);
        sound_count += engine.drain_sounds().len();
        if text && tick % report_every == 0 {
            println!("tick {:5}  live {:4}", tick, engine.live_count());
        }
    }

    let stats = engine.stats();
    if text {
        println!();
        println!("Done after {} ticks", args.ticks);
        println!("  live    {}", engine.live_count());
        println!("  spawned {}", stats.spawned);
        println!("  freed   {}", stats.freed);
        println!("  denied  {}", stats.denied);
        println!("  sounds  {}", sound_count);
    } else {
        let output = serde_json::json!({
            "template": args.template,
            "ticks": args.ticks,
            "live": engine.live_count(),
            "spawned": stats.spawned,
            "freed": stats.freed,
            "denied": stats.denied,
            "sounds": sound_count,
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap());
    }

    Ok(())
}

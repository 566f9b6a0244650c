//! Template inspection command

use std::path::Path;

use anyhow::{bail, Result};
use ember_core::RandPair;
use ember_template::{DynaMode, ParticleTemplate, TemplateRegistry};

pub fn run(name: &str, templates: &str, format: &str) -> Result<()> {
    let mut registry = TemplateRegistry::new();
    registry.load_dir(Path::new(templates))?;

    let Some(tpl) = registry.get_by_name(name) else {
        bail!("unknown template '{}'", name);
    };

    if format == "json" {
        print_json(tpl);
    } else {
        print_text(tpl);
    }
    Ok(())
}

fn roll(r: &RandPair) -> String {
    if r.rand == 0 {
        format!("{}", r.base)
    } else {
        format!("{} + rand & {:#06x}", r.base, r.rand)
    }
}

fn print_text(t: &ParticleTemplate) {
    println!("Template '{}'", t.name);
    println!("  sprite       {:?}", t.sprite);
    println!(
        "  image        base {} count {} rate {}",
        t.image_base,
        t.image_count,
        roll(&t.image_add)
    );
    println!("  rotate       {} rate {}", roll(&t.rotate), t.rotate_add);
    println!("  size         {} rate {}", t.size_base, t.size_add);
    if t.dynalight.mode != DynaMode::Off {
        println!(
            "  light        {:?} level {} falloff {}",
            t.dynalight.mode, t.dynalight.level, t.dynalight.falloff
        );
    }

    if t.lifetime == 0 && !t.end_on_last_frame {
        println!("  lifetime     eternal");
    } else if t.end_on_last_frame {
        println!("  lifetime     {} ticks, ends on last frame", t.lifetime);
    } else {
        println!("  lifetime     {} ticks", t.lifetime);
    }

    println!("  facing       {} spin {}", roll(&t.facing), t.facing_add);
    println!(
        "  spacing      hrz {} vrt {}",
        roll(&t.spacing_hrz),
        roll(&t.spacing_vrt)
    );
    println!(
        "  velocity     hrz {} vrt {}",
        roll(&t.vel_hrz),
        roll(&t.vel_vrt)
    );
    println!(
        "  motion       speed limit {} dampen {}",
        t.speed_limit, t.dampen
    );

    if t.homing {
        println!(
            "  homing       accel {} friction {} zaim {}",
            t.homing_accel, t.homing_friction, t.zaim_speed
        );
    }

    println!(
        "  bump         size {} height {} push {}",
        t.bump_size, t.bump_height, t.allow_push
    );
    if t.damage_base != 0.0 || t.damage_rand != 0.0 {
        println!(
            "  damage       {} + rand {} ({})",
            t.damage_base, t.damage_rand, t.damage_kind
        );
    }

    let mut ends = Vec::new();
    if t.end_in_water {
        ends.push("water");
    }
    if t.end_on_bump {
        ends.push("bump");
    }
    if t.end_on_ground {
        ends.push("ground");
    }
    if t.end_on_wall {
        ends.push("wall");
    }
    if !ends.is_empty() {
        println!("  ends on      {}", ends.join(", "));
    }

    if t.contspawn.amount > 0 {
        println!(
            "  contspawn    {} x '{}' every {} ticks",
            t.contspawn.amount,
            t.contspawn.child.as_deref().unwrap_or("?"),
            t.contspawn.delay
        );
    }
    if t.endspawn.amount > 0 {
        println!(
            "  endspawn     {} x '{}'",
            t.endspawn.amount,
            t.endspawn.child.as_deref().unwrap_or("?")
        );
    }

    if t.force {
        println!("  priority     may evict under load");
    }
}

fn rand_json(r: &RandPair) -> serde_json::Value {
    serde_json::json!({ "base": r.base, "rand": r.rand })
}

fn print_json(t: &ParticleTemplate) {
    let output = serde_json::json!({
        "name": t.name,
        "sprite": format!("{:?}", t.sprite).to_lowercase(),
        "image": {
            "base": t.image_base,
            "count": t.image_count,
            "rate": rand_json(&t.image_add),
        },
        "rotate": { "start": rand_json(&t.rotate), "rate": t.rotate_add },
        "size": { "base": t.size_base, "rate": t.size_add },
        "light": {
            "mode": format!("{:?}", t.dynalight.mode).to_lowercase(),
            "level": t.dynalight.level,
            "falloff": t.dynalight.falloff,
        },
        "lifetime": t.lifetime,
        "end_on_last_frame": t.end_on_last_frame,
        "facing": { "spread": rand_json(&t.facing), "spin": t.facing_add },
        "spacing": { "hrz": rand_json(&t.spacing_hrz), "vrt": rand_json(&t.spacing_vrt) },
        "velocity": { "hrz": rand_json(&t.vel_hrz), "vrt": rand_json(&t.vel_vrt) },
        "speed_limit": t.speed_limit,
        "dampen": t.dampen,
        "homing": {
            "enabled": t.homing,
            "accel": t.homing_accel,
            "friction": t.homing_friction,
            "zaim_speed": t.zaim_speed,
            "needs_target": t.needs_target,
            "target_caster": t.target_caster,
            "start_on_target": t.start_on_target,
        },
        "bump": {
            "size": t.bump_size,
            "height": t.bump_height,
            "allow_push": t.allow_push,
        },
        "damage": {
            "base": t.damage_base,
            "rand": t.damage_rand,
            "kind": t.damage_kind.as_str(),
            "friendly_fire": t.friendly_fire,
        },
        "ends": {
            "water": t.end_in_water,
            "bump": t.end_on_bump,
            "ground": t.end_on_ground,
            "wall": t.end_on_wall,
        },
        "contspawn": {
            "delay": t.contspawn.delay,
            "amount": t.contspawn.amount,
            "facing_add": t.contspawn.facing_add,
            "child": t.contspawn.child,
        },
        "endspawn": {
            "amount": t.endspawn.amount,
            "facing_add": t.endspawn.facing_add,
            "child": t.endspawn.child,
        },
        "sounds": {
            "spawn": t.sound_spawn,
            "end": t.sound_end,
            "floor": t.sound_floor,
            "wall": t.sound_wall,
        },
        "force": t.force,
    });

    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}

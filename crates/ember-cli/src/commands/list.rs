//! Registry listing command

use std::path::Path;

use anyhow::Result;
use ember_template::TemplateRegistry;

pub fn run(templates: &str, format: &str) -> Result<()> {
    let mut registry = TemplateRegistry::new();
    registry.load_dir(Path::new(templates))?;

    if format == "json" {
        let entries: Vec<serde_json::Value> = registry
            .iter()
            .map(|(id, t)| {
                serde_json::json!({
                    "id": id.index(),
                    "name": t.name,
                    "sprite": format!("{:?}", t.sprite).to_lowercase(),
                    "lifetime": t.lifetime,
                })
            })
            .collect();

        let output = serde_json::json!({
            "count": registry.len(),
            "splash": registry.splash.map(|id| id.index()),
            "ripple": registry.ripple.map(|id| id.index()),
            "templates": entries,
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap());
        return Ok(());
    }

    if registry.is_empty() {
        println!("No templates in {}", templates);
        return Ok(());
    }

    for (id, t) in registry.iter() {
        let mut tags = Vec::new();
        if Some(id) == registry.splash {
            tags.push("water splash");
        }
        if Some(id) == registry.ripple {
            tags.push("water ripple");
        }
        let tag = if tags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", tags.join(", "))
        };
        println!("  {:>4}  {:<24} {:?}{}", id.index(), t.name, t.sprite, tag);
    }

    Ok(())
}

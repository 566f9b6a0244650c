//! Template registry: id assignment, directory loading, child resolution

use std::collections::HashMap;
use std::path::Path;

use ember_core::{EmberError, Result};

use crate::template::ParticleTemplate;

/// Handle to a registered template. Ids are dense and assigned in
/// registration order, so they double as indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TemplateId(u32);

impl TemplateId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Wrap an externally supplied id. The id is not checked here;
    /// lookups against a registry that never issued it return `None`.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

/// Owns every loaded template. Spawning resolves a `TemplateId` here;
/// the world-effect slots point at the templates used for water entry
/// splashes and surface ripples, when those are loaded.
pub struct TemplateRegistry {
    templates: Vec<ParticleTemplate>,
    by_name: HashMap<String, TemplateId>,
    /// Template spawned when something solid drops into water
    pub splash: Option<TemplateId>,
    /// Template spawned when something pierces the water surface
    pub ripple: Option<TemplateId>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self {
            templates: Vec::new(),
            by_name: HashMap::new(),
            splash: None,
            ripple: None,
        }
    }

    /// Register one template under its own name
    pub fn register(&mut self, template: ParticleTemplate) -> Result<TemplateId> {
        if template.name.is_empty() {
            return Err(EmberError::ParseError(
                "Template must have a non-empty name".to_string(),
            ));
        }
        if self.by_name.contains_key(&template.name) {
            return Err(EmberError::DuplicateTemplateName(template.name.clone()));
        }

        let id = TemplateId(self.templates.len() as u32);
        self.by_name.insert(template.name.clone(), id);
        self.templates.push(template);
        Ok(id)
    }

    pub fn get(&self, id: TemplateId) -> Option<&ParticleTemplate> {
        self.templates.get(id.index())
    }

    pub fn id_by_name(&self, name: &str) -> Option<TemplateId> {
        self.by_name.get(name).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&ParticleTemplate> {
        self.get(self.id_by_name(name)?)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TemplateId, &ParticleTemplate)> {
        self.templates
            .iter()
            .enumerate()
            .map(|(i, t)| (TemplateId(i as u32), t))
    }

    /// Load every `*.toml` template in a directory, in file-stem order.
    ///
    /// Files that fail to parse are skipped with a warning, so one bad
    /// template cannot take down a whole effects directory. Afterwards
    /// child references are resolved and the well-known `splash` and
    /// `ripple` effects are bound if present. Returns how many
    /// templates this call loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("toml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut loaded = 0;
        for path in &paths {
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s.to_string(),
                None => continue,
            };

            let text = match std::fs::read_to_string(path) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("Warning: skipping template '{}': {}", path.display(), e);
                    continue;
                }
            };
            let table: toml::value::Table = match toml::from_str(&text) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("Warning: skipping template '{}': {}", path.display(), e);
                    continue;
                }
            };

            match self.register(ParticleTemplate::from_toml(stem, &table)) {
                Ok(_) => loaded += 1,
                Err(e) => eprintln!("Warning: skipping template '{}': {}", path.display(), e),
            }
        }

        self.resolve_children();
        self.bind_world_effects();
        println!("Loaded {} particle templates from {}", loaded, dir.display());
        Ok(loaded)
    }

    /// Resolve child-template names to ids. Rules that point at a
    /// missing template get disabled rather than spawning garbage.
    pub fn resolve_children(&mut self) {
        for i in 0..self.templates.len() {
            let cont_child = self.templates[i].contspawn.child.clone();
            let end_child = self.templates[i].endspawn.child.clone();

            if let Some(name) = cont_child {
                match self.by_name.get(&name).copied() {
                    Some(id) => self.templates[i].contspawn.child_id = Some(id),
                    None => {
                        eprintln!(
                            "Warning: template '{}' spawns unknown child '{}', disabling",
                            self.templates[i].name, name
                        );
                        self.templates[i].contspawn.amount = 0;
                    }
                }
            }

            if let Some(name) = end_child {
                match self.by_name.get(&name).copied() {
                    Some(id) => self.templates[i].endspawn.child_id = Some(id),
                    None => {
                        eprintln!(
                            "Warning: template '{}' spawns unknown child '{}', disabling",
                            self.templates[i].name, name
                        );
                        self.templates[i].endspawn.amount = 0;
                    }
                }
            }
        }
    }

    fn bind_world_effects(&mut self) {
        self.splash = self.id_by_name("splash");
        self.ripple = self.id_by_name("ripple");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::ParticleTemplate;

    fn named(name: &str) -> ParticleTemplate {
        let mut t = ParticleTemplate::default();
        t.name = name.to_string();
        t
    }

    #[test]
    fn register_assigns_dense_ids() {
        let mut reg = TemplateRegistry::new();
        let a = reg.register(named("a")).unwrap();
        let b = reg.register(named("b")).unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(reg.get(a).unwrap().name, "a");
        assert_eq!(reg.id_by_name("b"), Some(b));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut reg = TemplateRegistry::new();
        reg.register(named("spark")).unwrap();
        assert!(matches!(
            reg.register(named("spark")),
            Err(EmberError::DuplicateTemplateName(_))
        ));
    }

    #[test]
    fn children_resolve_by_name() {
        let mut reg = TemplateRegistry::new();
        let mut parent = named("parent");
        parent.contspawn.amount = 2;
        parent.contspawn.child = Some("child".to_string());
        reg.register(parent).unwrap();
        let child_id = reg.register(named("child")).unwrap();

        reg.resolve_children();
        let parent = reg.get_by_name("parent").unwrap();
        assert_eq!(parent.contspawn.child_id, Some(child_id));
        assert_eq!(parent.contspawn.amount, 2);
    }

    #[test]
    fn unresolved_children_are_disabled() {
        let mut reg = TemplateRegistry::new();
        let mut orphan = named("orphan");
        orphan.endspawn.amount = 4;
        orphan.endspawn.child = Some("nobody".to_string());
        reg.register(orphan).unwrap();

        reg.resolve_children();
        let orphan = reg.get_by_name("orphan").unwrap();
        assert_eq!(orphan.endspawn.child_id, None);
        assert_eq!(orphan.endspawn.amount, 0);
    }

    #[test]
    fn load_dir_reads_sorted_and_skips_bad_files() {
        let dir = std::env::temp_dir().join(format!("ember-templates-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("spark.toml"), "lifetime = 10\n").unwrap();
        std::fs::write(dir.join("broken.toml"), "lifetime = = 10\n").unwrap();
        std::fs::write(dir.join("ripple.toml"), "lifetime = 20\n").unwrap();
        std::fs::write(dir.join("notes.txt"), "not a template\n").unwrap();

        let mut reg = TemplateRegistry::new();
        let loaded = reg.load_dir(&dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(loaded, 2);
        assert!(reg.get_by_name("spark").is_some());
        assert!(reg.get_by_name("broken").is_none());
        // the well-known ripple slot binds automatically
        assert_eq!(reg.ripple, reg.id_by_name("ripple"));
        assert!(reg.ripple.is_some());
        assert!(reg.splash.is_none());
    }
}

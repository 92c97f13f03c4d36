use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::resources::ResourceKind;
use crate::templates::{Template, TemplateLoadError};

/// Read-only catalog of the templates found at startup, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: Vec<Template>,
}

impl TemplateRegistry {
    pub fn new(mut templates: Vec<Template>) -> TemplateRegistry {
        templates.sort_by(|a, b| a.name().cmp(b.name()));

        TemplateRegistry { templates }
    }

    /// Loads every template directory below `root`.
    ///
    /// Only an unreadable `root` fails the load. A template whose manifests are missing,
    /// malformed, of the wrong kind or invalid is logged and left out of the catalog.
    pub fn load_all(root: &Path) -> Result<TemplateRegistry, TemplateLoadError> {
        let entries = fs::read_dir(root).map_err(|source| TemplateLoadError::ReadRoot {
            path: root.to_path_buf(),
            source,
        })?;

        let mut templates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| TemplateLoadError::ReadRoot {
                path: root.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                warn!(path = %path.display(), "skipping template directory with a non UTF-8 name");
                continue;
            };

            match load_template(&path, name) {
                Ok(template) => templates.push(template),
                Err(err) => {
                    warn!(template = name, error = %err, "excluding template from the catalog");
                }
            }
        }

        let registry = TemplateRegistry::new(templates);
        info!(templates = registry.len(), root = %root.display(), "loaded template catalog");

        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|template| template.name() == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.templates
            .iter()
            .map(|template| template.name().to_owned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn load_template(dir: &Path, name: &str) -> Result<Template, TemplateLoadError> {
    Template::from_manifests(
        name,
        read_manifest(dir, ResourceKind::ConfigMap)?,
        read_manifest(dir, ResourceKind::VolumeClaim)?,
        read_manifest(dir, ResourceKind::Deployment)?,
        read_manifest(dir, ResourceKind::Service)?,
    )
}

/// Reads the manifest of `kind` from `dir`, checking its declared kind before
/// deserializing it into the typed object.
fn read_manifest<K: DeserializeOwned>(
    dir: &Path,
    kind: ResourceKind,
) -> Result<K, TemplateLoadError> {
    let path = dir.join(kind.manifest_file());
    let contents = fs::read_to_string(&path).map_err(|source| TemplateLoadError::Io {
        path: path.clone(),
        source,
    })?;

    let value: serde_yaml::Value =
        serde_yaml::from_str(&contents).map_err(|source| TemplateLoadError::Yaml {
            path: path.clone(),
            source,
        })?;

    let declared = value.get("kind").and_then(|kind| kind.as_str());
    if declared != Some(kind.api_kind()) {
        return Err(TemplateLoadError::KindMismatch {
            path,
            expected: kind,
            found: declared.map(str::to_owned),
        });
    }

    let object = serde_yaml::from_value(value).map_err(|source| TemplateLoadError::Yaml {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), %kind, "parsed template manifest");

    Ok(object)
}

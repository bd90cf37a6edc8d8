//! # Template Registry
//!
//! Name → parsed template cache. Templates ship embedded in the binary from
//! the crate's `templates/` directory; an optional on-disk directory shadows
//! embedded templates of the same name. A template's name is its file stem
//! (`scleral_v4` for `scleral_v4.xml`); lookups also accept the file name.
//!
//! Lookups are read-through: the first `get_template` for a name parses the
//! XML, later calls share the same `Arc`. Entries are never invalidated, so
//! edits to an on-disk template need a restart.

use include_dir::{Dir, include_dir};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};
use tracing::debug;

use super::LabelTemplate;
use crate::envelope::Envelope;
use crate::error::{EtiketError, Result};
use crate::values::ValueMap;

/// Templates compiled into the binary.
static BUILTIN_TEMPLATES: Dir = include_dir!("$CARGO_MANIFEST_DIR/templates");

static GLOBAL: OnceLock<TemplateRegistry> = OnceLock::new();

/// Read-through template cache.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    dir: Option<PathBuf>,
    cache: RwLock<HashMap<String, Arc<LabelTemplate>>>,
}

impl TemplateRegistry {
    /// Registry over the embedded templates only.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Registry whose on-disk directory shadows embedded templates.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Directory consulted before the embedded templates, if any.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// All template names (stems of `.xml` files), sorted.
    pub fn list_templates(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = BUILTIN_TEMPLATES
            .files()
            .filter_map(|file| template_name(file.path()))
            .collect();

        if let Some(dir) = &self.dir {
            match std::fs::read_dir(dir) {
                Ok(entries) => {
                    names.extend(entries.flatten().filter_map(|entry| template_name(&entry.path())));
                }
                Err(e) => debug!(dir = %dir.display(), error = %e, "template directory unreadable"),
            }
        }

        names.into_iter().collect()
    }

    /// Look up a template by name, parsing it on first use.
    pub fn get_template(&self, name: &str) -> Result<Arc<LabelTemplate>> {
        let name = name.strip_suffix(".xml").unwrap_or(name);
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(template) = cache.get(name) {
                return Ok(Arc::clone(template));
            }
        }

        let template = Arc::new(self.load(name)?);
        debug!(name, elements = template.element_count(), "template cached");

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        let entry = cache.entry(name.to_string()).or_insert(template);
        Ok(Arc::clone(entry))
    }

    /// Render a named template with the given values.
    pub fn render_template(&self, name: &str, values: &ValueMap) -> Result<Envelope> {
        Ok(self.get_template(name)?.render(values))
    }

    fn load(&self, name: &str) -> Result<LabelTemplate> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(self.unknown(name));
        }

        let file_name = format!("{}.xml", name);
        if let Some(dir) = &self.dir {
            let path = dir.join(&file_name);
            if path.is_file() {
                return LabelTemplate::from_path(&path);
            }
        }

        let file = BUILTIN_TEMPLATES
            .get_file(&file_name)
            .ok_or_else(|| self.unknown(name))?;
        let text = file.contents_utf8().ok_or_else(|| {
            EtiketError::Template(format!("Template {} is not valid UTF-8", file_name))
        })?;
        LabelTemplate::parse(text, &file_name)
    }

    fn unknown(&self, name: &str) -> EtiketError {
        EtiketError::UnknownTemplate {
            name: name.to_string(),
            available: self.list_templates(),
        }
    }
}

fn template_name(path: &Path) -> Option<String> {
    if path.extension()? != "xml" {
        return None;
    }
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
}

/// Process-wide registry, initialised on first use.
///
/// `ETIKET_TEMPLATE_DIR`, when set at first use, becomes the shadowing
/// on-disk directory.
pub fn global() -> &'static TemplateRegistry {
    GLOBAL.get_or_init(|| match std::env::var_os("ETIKET_TEMPLATE_DIR") {
        Some(dir) => TemplateRegistry::with_dir(dir),
        None => TemplateRegistry::builtin(),
    })
}

/// Template names known to the global registry.
pub fn list_templates() -> Vec<String> {
    global().list_templates()
}

/// Look up a template in the global registry.
pub fn get_template(name: &str) -> Result<Arc<LabelTemplate>> {
    global().get_template(name)
}

/// Render a template from the global registry.
pub fn render_template(name: &str, values: &ValueMap) -> Result<Envelope> {
    global().render_template(name, values)
}

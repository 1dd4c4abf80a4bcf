//! Configuration templates.
//!
//! A template is a text file of device commands with `{name}` placeholders.
//! `{{` and `}}` produce literal braces.
//!
//! ```text
//! vlan {vlan_id}
//!  description {vlan_name}
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use indexmap::IndexMap;
use log::debug;
use regex::Regex;

use crate::error::TemplateError;

/// Placeholder values, keyed by placeholder name.
pub type TemplateParams = IndexMap<String, String>;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid regex pattern")
});

/// Renders a named template to command text.
pub trait TemplateRenderer: Send + Sync {
    /// Render `name` with `params` substituted.
    fn render(&self, name: &str, params: &TemplateParams) -> Result<String, TemplateError>;
}

/// Substitute `params` into `text`.
pub fn render_str(name: &str, text: &str, params: &TemplateParams) -> Result<String, TemplateError> {
    let mut rendered = String::with_capacity(text.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        rendered.push_str(&text[last..whole.start()]);
        last = whole.end();

        match caps.get(1) {
            Some(param) => {
                let value = params
                    .get(param.as_str())
                    .ok_or_else(|| TemplateError::ParamMissing {
                        name: name.to_string(),
                        param: param.as_str().to_string(),
                    })?;
                rendered.push_str(value);
            }
            None => rendered.push_str(&whole.as_str()[..1]),
        }
    }

    rendered.push_str(&text[last..]);
    Ok(rendered)
}

/// Reads templates from a directory.
#[derive(Debug, Clone)]
pub struct FileTemplateRenderer {
    root: PathBuf,
}

impl FileTemplateRenderer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Option<PathBuf> {
        let plain = !name.is_empty()
            && !name.contains(['/', '\\'])
            && !name.contains("..");
        plain.then(|| self.root.join(name))
    }
}

impl TemplateRenderer for FileTemplateRenderer {
    fn render(&self, name: &str, params: &TemplateParams) -> Result<String, TemplateError> {
        let missing = || TemplateError::Missing {
            name: name.to_string(),
        };
        let path = self.path_for(name).ok_or_else(missing)?;

        let text = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => missing(),
            _ => TemplateError::Io {
                name: name.to_string(),
                message: e.to_string(),
            },
        })?;

        debug!("rendering template {}", path.display());
        render_str(name, &text, params)
    }
}

/// Templates held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplates {
    templates: IndexMap<String, String>,
}

impl InMemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a template.
    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.templates.insert(name.into(), text.into());
        self
    }
}

impl TemplateRenderer for InMemoryTemplates {
    fn render(&self, name: &str, params: &TemplateParams) -> Result<String, TemplateError> {
        let text = self.templates.get(name).ok_or_else(|| TemplateError::Missing {
            name: name.to_string(),
        })?;
        render_str(name, text, params)
    }
}

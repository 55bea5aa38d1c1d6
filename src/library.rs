//! `ComponentLibrary` — the registry of component templates by kind.

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{info, warn};

use crate::component::{
    builtin, Component, ComponentBuilder, ComponentId, ComponentTemplate, Propagate, Properties,
};
use crate::error::{SimError, SimResult};

/// Templates available for instantiation, keyed by kind name.
#[derive(Debug, Default)]
pub struct ComponentLibrary {
    templates: BTreeMap<String, ComponentTemplate>,
}

impl ComponentLibrary {
    /// An empty library.
    pub fn new() -> Self {
        ComponentLibrary {
            templates: BTreeMap::new(),
        }
    }

    /// A library holding every built-in template.
    pub fn with_builtins() -> Self {
        let mut library = Self::new();
        library.add_templates(builtin::all());
        library
    }

    /// Register a template. A kind that is already registered is kept
    /// and the new template is rejected.
    pub fn add_template(&mut self, template: ComponentTemplate) -> bool {
        if self.templates.contains_key(template.kind()) {
            warn!(kind = template.kind(), "duplicate template rejected");
            return false;
        }
        self.templates.insert(template.kind().to_owned(), template);
        true
    }

    /// Register several templates; returns how many were accepted.
    pub fn add_templates<I>(&mut self, templates: I) -> usize
    where
        I: IntoIterator<Item = ComponentTemplate>,
    {
        let added = templates
            .into_iter()
            .map(|t| self.add_template(t))
            .filter(|ok| *ok)
            .count();
        info!(added, total = self.templates.len(), "templates registered");
        added
    }

    pub fn template(&self, kind: &str) -> Option<&ComponentTemplate> {
        self.templates.get(kind)
    }

    /// Registered kind names in sorted order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Build a component of `kind` with the given overrides.
    pub fn instantiate(
        &self,
        kind: &str,
        id: ComponentId,
        parent: Rc<dyn Propagate>,
        overrides: Properties,
    ) -> SimResult<Component> {
        let template = self
            .template(kind)
            .ok_or_else(|| SimError::UnknownKind(kind.to_owned()))?;
        ComponentBuilder::new(id, template)
            .parent(parent)
            .properties(overrides)
            .build()
    }
}

use std::collections::BTreeMap;

use concierge_core::domain::customer::CustomerId;
use serde::Deserialize;
use tera::{Context, Tera};
use thiserror::Error;

pub const ORCHESTRATOR: &str = "orchestrator";
pub const HOUSEKEEPING: &str = "housekeeping";
pub const ROOM_SERVICE: &str = "room_service";

const EMBEDDED_TEMPLATES: [(&str, &str); 3] = [
    (ORCHESTRATOR, include_str!("../../../templates/agents/orchestrator.toml")),
    (HOUSEKEEPING, include_str!("../../../templates/agents/housekeeping.toml")),
    (ROOM_SERVICE, include_str!("../../../templates/agents/room_service.toml")),
];

/// An agent prompt resource: what the agent is called, how other agents
/// describe it when handing off, and its instructions template.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub description: String,
    pub template: String,
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt template `{0}` is not registered")]
    Missing(String),
    #[error("prompt resource `{resource}` is not valid TOML: {source}")]
    Parse {
        resource: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("prompt template `{name}` could not be compiled: {source}")]
    Compile {
        name: String,
        #[source]
        source: tera::Error,
    },
    #[error("prompt template `{name}` could not be rendered: {source}")]
    Render {
        name: String,
        #[source]
        source: tera::Error,
    },
}

pub struct PromptLibrary {
    templates: BTreeMap<String, PromptTemplate>,
    tera: Tera,
}

impl PromptLibrary {
    /// The templates compiled into the binary.
    pub fn embedded() -> Result<Self, PromptError> {
        Self::from_sources(EMBEDDED_TEMPLATES)
    }

    /// Builds a library from `(resource, toml)` pairs. Templates are keyed by
    /// their declared `name`, so a later resource replaces an earlier one.
    pub fn from_sources<'a>(
        sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, PromptError> {
        let mut templates = BTreeMap::new();
        let mut tera = Tera::default();

        for (resource, raw) in sources {
            let template: PromptTemplate = toml::from_str(raw)
                .map_err(|source| PromptError::Parse { resource: resource.to_string(), source })?;
            tera.add_raw_template(&template.name, &template.template).map_err(|source| {
                PromptError::Compile { name: template.name.clone(), source }
            })?;
            templates.insert(template.name.clone(), template);
        }

        Ok(Self { templates, tera })
    }

    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Result<&PromptTemplate, PromptError> {
        self.templates.get(name).ok_or_else(|| PromptError::Missing(name.to_string()))
    }

    pub fn render(
        &self,
        name: &str,
        guest_id: CustomerId,
        guest_name: &str,
    ) -> Result<String, PromptError> {
        self.get(name)?;

        let mut context = Context::new();
        context.insert("guest_id", &guest_id.0);
        context.insert("guest_name", guest_name.trim());

        self.tera
            .render(name, &context)
            .map(|rendered| rendered.trim().to_string())
            .map_err(|source| PromptError::Render { name: name.to_string(), source })
    }
}

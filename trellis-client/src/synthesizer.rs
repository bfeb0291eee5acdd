//! Turns stored `(template, script)` pairs into renderable components.
//!
//! A script is a JSON export object, optionally wrapped in `default`:
//!
//! ```json
//! { "default": { "name": "Greeting", "data": { "who": "world" }, "render": "<p>Hello {{ who }}</p>" } }
//! ```
//!
//! or `builtin:<name>`, which hands the template to a compiled-in
//! [`ComponentBuilder`]. Nothing in a script is executed.

use crate::error::{EvaluationError, RenderError};
use crate::template;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Rendered in place of a component whose script could not be evaluated.
pub const LOAD_FAILURE_MARKUP: &str = r#"<div style="color: red">Error loading component</div>"#;

/// Rendered in place of a component whose render template failed.
pub const RENDER_FAILURE_MARKUP: &str = r#"<div style="color: red">Error rendering component</div>"#;

const BUILTIN_PREFIX: &str = "builtin:";

/// The behavioral definition extracted from a script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentDefinition {
    pub name: Option<String>,
    pub data: Map<String, Value>,
    /// Render template. When absent the stored template is emitted verbatim.
    pub render: Option<String>,
}

/// Produces a component definition from a stored template.
pub trait ComponentBuilder: Send + Sync {
    fn build(&self, template: &str) -> anyhow::Result<ComponentDefinition>;
}

/// A successfully evaluated dynamic component.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicComponent {
    template: String,
    definition: ComponentDefinition,
}

impl DynamicComponent {
    pub fn new(template: impl Into<String>, definition: ComponentDefinition) -> Self {
        Self {
            template: template.into(),
            definition,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.definition.name.as_deref()
    }

    pub fn definition(&self) -> &ComponentDefinition {
        &self.definition
    }

    pub fn render(&self) -> Result<String, RenderError> {
        match &self.definition.render {
            Some(render) => template::render(render, &self.definition.data),
            None => Ok(format!("<div>{}</div>", self.template)),
        }
    }
}

/// The rendering unit attached to a route.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    /// A view compiled into the shell, identified by name.
    View(String),
    Dynamic(Arc<DynamicComponent>),
    /// Stand-in for a component that failed to evaluate.
    Fault(EvaluationError),
}

impl Component {
    pub fn view(name: impl Into<String>) -> Self {
        Self::View(name.into())
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }

    /// Renders to markup. Never fails: errors become the fixed diagnostic markup.
    pub fn render(&self) -> String {
        match self {
            Self::View(name) => format!(r#"<div data-view="{name}"></div>"#),
            Self::Dynamic(component) => component.render().unwrap_or_else(|e| {
                warn!(component = component.name().unwrap_or("<anonymous>"), "Render failed: {e}");
                RENDER_FAILURE_MARKUP.to_string()
            }),
            Self::Fault(_) => LOAD_FAILURE_MARKUP.to_string(),
        }
    }
}

/// Evaluates component scripts.
#[derive(Clone, Default)]
pub struct Synthesizer {
    builders: HashMap<String, Arc<dyn ComponentBuilder>>,
}

impl Synthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `builder` available to scripts of the form `builtin:<name>`.
    pub fn register_builder(&mut self, name: impl Into<String>, builder: Arc<dyn ComponentBuilder>) {
        self.builders.insert(name.into(), builder);
    }

    #[must_use]
    pub fn with_builder(mut self, name: impl Into<String>, builder: Arc<dyn ComponentBuilder>) -> Self {
        self.register_builder(name, builder);
        self
    }

    /// Builds the component for a stored page. Evaluation failures are
    /// logged and contained in a [`Component::Fault`].
    pub fn synthesize(&self, template: &str, script: &str) -> Component {
        match self.evaluate(template, script) {
            Ok(definition) => Component::Dynamic(Arc::new(DynamicComponent::new(template, definition))),
            Err(e) => {
                warn!("Error evaluating dynamic component script: {e}");
                Component::Fault(e)
            }
        }
    }

    pub fn evaluate(&self, template: &str, script: &str) -> Result<ComponentDefinition, EvaluationError> {
        let script = script.trim();
        if let Some(name) = script.strip_prefix(BUILTIN_PREFIX) {
            return self.run_builder(name.trim(), template);
        }

        let exports: Value =
            serde_json::from_str(script).map_err(|e| EvaluationError::Malformed(e.to_string()))?;
        let Value::Object(mut exports) = exports else {
            return Err(EvaluationError::NotAnObject);
        };
        let object = match exports.remove("default") {
            Some(Value::Object(default)) => default,
            Some(other) => {
                exports.insert("default".to_string(), other);
                exports
            }
            None => exports,
        };
        definition_from(object)
    }

    fn run_builder(&self, name: &str, template: &str) -> Result<ComponentDefinition, EvaluationError> {
        let builder = self
            .builders
            .get(name)
            .ok_or_else(|| EvaluationError::UnknownBuilder(name.to_string()))?;

        match catch_unwind(AssertUnwindSafe(|| builder.build(template))) {
            Ok(Ok(definition)) => Ok(definition),
            Ok(Err(e)) => Err(EvaluationError::BuilderFailed {
                builder: name.to_string(),
                message: format!("{e:#}"),
            }),
            Err(payload) => Err(EvaluationError::BuilderPanicked {
                builder: name.to_string(),
                message: panic_message(payload),
            }),
        }
    }
}

fn definition_from(mut object: Map<String, Value>) -> Result<ComponentDefinition, EvaluationError> {
    let name = match object.remove("name") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            return Err(EvaluationError::InvalidMember {
                member: "name",
                expected: "a string",
            });
        }
    };
    let data = match object.remove("data") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(EvaluationError::InvalidMember {
                member: "data",
                expected: "an object",
            });
        }
    };
    let render = match object.remove("render") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            return Err(EvaluationError::InvalidMember {
                member: "render",
                expected: "a template string",
            });
        }
    };
    Ok(ComponentDefinition { name, data, render })
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

//! Extension-contributed page definitions.

use crate::PageId;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Access requirements attached to a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessMeta {
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub requires_auth: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub requires_admin: bool,
}

impl AccessMeta {
    /// No access requirements.
    pub const PUBLIC: Self = Self {
        requires_auth: false,
        requires_admin: false,
    };

    /// Requires an authenticated admin session.
    pub const ADMIN: Self = Self {
        requires_auth: true,
        requires_admin: true,
    };
}

/// A page definition as published by an extension.
///
/// `path` and `name` are each unique among persisted definitions; a write
/// that matches an existing row on either updates that row in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDefinition {
    pub path: String,
    pub name: String,
    pub component_template: String,
    pub component_script: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub requires_auth: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub requires_admin: bool,
    /// Name of a static route whose rendering and access flags this page
    /// replaces. Not checked at write time.
    #[serde(default)]
    pub overrides_route_name: Option<String>,
}

impl PageDefinition {
    /// Creates a public, non-overriding page definition.
    pub fn new(
        path: impl Into<String>,
        name: impl Into<String>,
        component_template: impl Into<String>,
        component_script: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            component_template: component_template.into(),
            component_script: component_script.into(),
            requires_auth: false,
            requires_admin: false,
            overrides_route_name: None,
        }
    }

    /// Sets the access flags.
    #[must_use]
    pub fn with_access(mut self, meta: AccessMeta) -> Self {
        self.requires_auth = meta.requires_auth;
        self.requires_admin = meta.requires_admin;
        self
    }

    /// Marks this page as an override of the named static route.
    #[must_use]
    pub fn overriding(mut self, route_name: impl Into<String>) -> Self {
        self.overrides_route_name = Some(route_name.into());
        self
    }

    pub fn access(&self) -> AccessMeta {
        AccessMeta {
            requires_auth: self.requires_auth,
            requires_admin: self.requires_admin,
        }
    }

    /// Checks that every required field is present and non-empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("path", &self.path),
            ("name", &self.name),
            ("componentTemplate", &self.component_template),
            ("componentScript", &self.component_script),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }
        Ok(())
    }
}

/// A page definition together with its row identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPage {
    pub id: PageId,
    #[serde(flatten)]
    pub definition: PageDefinition,
}

impl std::ops::Deref for StoredPage {
    type Target = PageDefinition;

    fn deref(&self) -> &Self::Target {
        &self.definition
    }
}

/// A page definition was rejected before reaching the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("page definition is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Accepts JSON booleans as well as the legacy `0`/`1` integer encoding.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}

//! Read-only access to a source's user-supplied parameters.
//!
//! Parameters come from the metrics listing; defaults and the legal value
//! sets of enumerated parameters come from a [`ParameterDefinitions`] table
//! owned by the data model. The view resolves one against the other and
//! never invents a value absent from both.

use std::collections::BTreeMap;
use std::sync::Arc;

use url::Url;

use crate::collector::CollectError;
use crate::model::ParameterValue;

/// Definition of one parameter: its default and, for enumerated parameters,
/// the full legal value set.
#[derive(Debug, Clone, Default)]
pub struct ParameterDefinition {
    /// Value used when the user supplied none.
    pub default: Option<ParameterValue>,
    /// For enumerated parameters, every legal value. An enumerated parameter
    /// with no user-supplied value resolves to this whole set.
    pub values: Option<Vec<String>>,
}

/// Table of parameter definitions, keyed by parameter name.
#[derive(Debug, Clone, Default)]
pub struct ParameterDefinitions {
    definitions: BTreeMap<String, ParameterDefinition>,
}

impl ParameterDefinitions {
    /// Create an empty definition table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a default value for a parameter.
    #[must_use]
    pub fn with_default(mut self, name: impl Into<String>, default: impl Into<ParameterValue>) -> Self {
        self.definitions
            .entry(name.into())
            .or_default()
            .default = Some(default.into());
        self
    }

    /// Define an enumerated parameter with its full legal value set.
    #[must_use]
    pub fn with_values<const N: usize>(mut self, name: impl Into<String>, values: [&str; N]) -> Self {
        self.definitions.entry(name.into()).or_default().values =
            Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    fn get(&self, name: &str) -> Option<&ParameterDefinition> {
        self.definitions.get(name)
    }
}

/// Read-only view of one source's parameters with defaulting applied.
///
/// Cheap to clone; the definition table is shared.
#[derive(Debug, Clone)]
pub struct ParameterView {
    parameters: BTreeMap<String, ParameterValue>,
    definitions: Arc<ParameterDefinitions>,
}

impl ParameterView {
    /// Create a view over the given parameters and definition table.
    pub fn new(
        parameters: BTreeMap<String, ParameterValue>,
        definitions: Arc<ParameterDefinitions>,
    ) -> Self {
        Self {
            parameters,
            definitions,
        }
    }

    /// Look up a single-valued parameter, falling back to its default.
    ///
    /// An empty user-supplied value counts as missing.
    pub fn get(&self, name: &str) -> Option<&str> {
        if let Some(ParameterValue::Single(s)) = self.parameters.get(name) {
            if !s.is_empty() {
                return Some(s);
            }
        }
        match self.definitions.get(name)?.default.as_ref()? {
            ParameterValue::Single(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Look up a multi-valued parameter.
    ///
    /// An enumerated parameter with no user-supplied value resolves to its
    /// full legal value set; anything else missing resolves to an empty list.
    pub fn get_all(&self, name: &str) -> Vec<String> {
        if let Some(value) = self.parameters.get(name) {
            return match value {
                ParameterValue::Single(s) => vec![s.clone()],
                ParameterValue::Multiple(values) => values.clone(),
            };
        }
        let Some(definition) = self.definitions.get(name) else {
            return Vec::new();
        };
        if let Some(values) = &definition.values {
            return values.clone();
        }
        match &definition.default {
            Some(ParameterValue::Single(s)) => vec![s.clone()],
            Some(ParameterValue::Multiple(values)) => values.clone(),
            None => Vec::new(),
        }
    }

    /// The source's base URL with trailing slashes stripped.
    pub fn base_url(&self) -> Result<Url, CollectError> {
        let url = self
            .get("url")
            .ok_or(CollectError::MissingParameter("url"))?;
        Ok(Url::parse(url.trim_end_matches('/'))?)
    }

    /// The user-supplied landing URL, if any.
    pub fn landing_url(&self) -> Option<Url> {
        Url::parse(self.get("landing_url")?.trim_end_matches('/')).ok()
    }

    /// The basic-auth username, if any.
    pub fn username(&self) -> Option<&str> {
        self.get("username")
    }

    /// The basic-auth password, if any.
    pub fn password(&self) -> Option<&str> {
        self.get("password")
    }

    /// The private token, if any. Takes precedence over username/password.
    pub fn private_token(&self) -> Option<&str> {
        self.get("private_token")
    }

    /// A single-valued parameter, percent-encoded for safe URL embedding.
    pub fn get_url_encoded(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|value| url::form_urlencoded::byte_serialize(value.as_bytes()).collect())
    }
}

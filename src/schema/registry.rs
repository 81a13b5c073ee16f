//! Registry of the grammars bundled with the binary

use crate::schema::grammar::{ElementRule, LIFECYCLE_CONFIGURATION};

/// A bundled grammar
#[derive(Debug)]
pub struct Schema {
    /// Registry key, the snake_case form of the root element
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// Root element rule
    pub root: &'static ElementRule,
    /// RELAX NG compact syntax source
    pub source: &'static str,
}

static SCHEMAS: [Schema; 1] = [Schema {
    name: "lifecycle_configuration",
    title: "Lifecycle Configuration",
    description: "Object expiration and storage transition rules for a bucket",
    root: &LIFECYCLE_CONFIGURATION,
    source: include_str!("../../schemas/lifecycle_configuration.rnc"),
}];

/// Lookup of bundled schemas by name or root element
#[derive(Debug, Clone, Copy)]
pub struct SchemaRegistry {
    schemas: &'static [Schema],
}

impl SchemaRegistry {
    /// Get a schema by registry name
    pub fn get(&self, name: &str) -> Option<&'static Schema> {
        self.schemas.iter().find(|s| s.name == name)
    }

    /// Find the schema for a document root element, e.g. `LifecycleConfiguration`
    pub fn find_by_root_tag(&self, root_tag: &str) -> Option<&'static Schema> {
        self.get(&camel_to_snake(root_tag))
    }

    pub fn list(&self) -> impl Iterator<Item = &'static Schema> {
        self.schemas.iter()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self { schemas: &SCHEMAS }
    }
}

/// Convert a CamelCase element name to snake_case
///
/// Acronym runs stay together: `IDPolicy` becomes `id_policy`.
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let acronym_end = i > 0
                && chars[i - 1].is_uppercase()
                && chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev_lower || acronym_end {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Model name aliasing and normalization.

use std::collections::BTreeMap;

use crate::types::{ModelCard, ModelList};

/// Provider prefix accepted in front of any model name.
pub const DEFAULT_PROVIDER_PREFIX: &str = "claude-code-cli/";
/// Alias used when a requested model is unknown.
pub const DEFAULT_ALIAS: &str = "opus";
/// Model reported when the CLI did not say which model answered.
pub const FALLBACK_MODEL: &str = "claude-sonnet-4";
/// Owner reported by `/v1/models`.
pub const MODEL_OWNER: &str = "anthropic";

/// Canonical model family names, in catalog order.
pub const CANONICAL_MODELS: [&str; 3] = ["claude-opus-4", "claude-sonnet-4", "claude-haiku-4"];

/// Maps requested model names to CLI aliases.
///
/// Resolution never fails: exact match first, then the name with the provider
/// prefix stripped, then the default alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAliases {
    table: BTreeMap<String, String>,
    provider_prefix: String,
    default_alias: String,
    fallback_model: String,
}

impl Default for ModelAliases {
    fn default() -> Self {
        Self::new(
            builtin_table(),
            DEFAULT_PROVIDER_PREFIX,
            DEFAULT_ALIAS,
            FALLBACK_MODEL,
        )
    }
}

impl ModelAliases {
    /// Build an alias set from explicit parts. An empty table means the
    /// built-in one.
    pub fn new(
        table: BTreeMap<String, String>,
        provider_prefix: impl Into<String>,
        default_alias: impl Into<String>,
        fallback_model: impl Into<String>,
    ) -> Self {
        let table = if table.is_empty() {
            builtin_table()
        } else {
            table
        };
        Self {
            table,
            provider_prefix: provider_prefix.into(),
            default_alias: default_alias.into(),
            fallback_model: fallback_model.into(),
        }
    }

    /// Resolve a requested model name to the alias passed to the CLI.
    pub fn resolve(&self, requested: &str) -> &str {
        if let Some(alias) = self.table.get(requested) {
            return alias;
        }
        if !self.provider_prefix.is_empty() {
            if let Some(stripped) = requested.strip_prefix(self.provider_prefix.as_str()) {
                if let Some(alias) = self.table.get(stripped) {
                    return alias;
                }
            }
        }
        &self.default_alias
    }

    /// Alias used for unknown names.
    pub fn default_alias(&self) -> &str {
        &self.default_alias
    }

    /// Model name reported when the CLI gives none.
    pub fn fallback_model(&self) -> &str {
        &self.fallback_model
    }

    /// Accepted provider prefix.
    pub fn provider_prefix(&self) -> &str {
        &self.provider_prefix
    }

    /// The `/v1/models` catalog.
    pub fn catalog(&self, created: u64) -> ModelList {
        ModelList {
            object: "list".into(),
            data: CANONICAL_MODELS
                .iter()
                .map(|id| ModelCard {
                    id: (*id).into(),
                    object: "model".into(),
                    owned_by: MODEL_OWNER.into(),
                    created,
                })
                .collect(),
        }
    }
}

fn builtin_table() -> BTreeMap<String, String> {
    let mut table = BTreeMap::new();
    for alias in ["opus", "sonnet", "haiku"] {
        let canonical = format!("claude-{alias}-4");
        table.insert(
            format!("{DEFAULT_PROVIDER_PREFIX}{canonical}"),
            alias.to_string(),
        );
        table.insert(canonical, alias.to_string());
        table.insert(alias.to_string(), alias.to_string());
    }
    table
}

/// Collapse a concrete model id to its family name.
///
/// `claude-sonnet-4-5-20250929` becomes `claude-sonnet-4`; names that match no
/// family pass through unchanged.
pub fn normalize_model_name(model: &str) -> String {
    if model.contains("opus") {
        "claude-opus-4".into()
    } else if model.contains("sonnet") {
        "claude-sonnet-4".into()
    } else if model.contains("haiku") {
        "claude-haiku-4".into()
    } else {
        model.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_covers_all_spellings() {
        let aliases = ModelAliases::default();
        for family in ["opus", "sonnet", "haiku"] {
            assert_eq!(aliases.resolve(family), family);
            assert_eq!(aliases.resolve(&format!("claude-{family}-4")), family);
            assert_eq!(
                aliases.resolve(&format!("claude-code-cli/claude-{family}-4")),
                family
            );
        }
    }

    #[test]
    fn unknown_models_use_default_alias() {
        let aliases = ModelAliases::default();
        assert_eq!(aliases.resolve("gpt-4o"), "opus");
        assert_eq!(aliases.resolve(""), "opus");
        assert_eq!(aliases.resolve("claude-code-cli/gpt-4o"), "opus");
    }

    #[test]
    fn custom_prefix_is_stripped() {
        let mut table = BTreeMap::new();
        table.insert("fast".to_string(), "haiku".to_string());
        let aliases = ModelAliases::new(table, "acme/", "sonnet", "claude-sonnet-4");
        assert_eq!(aliases.resolve("acme/fast"), "haiku");
        assert_eq!(aliases.resolve("fast"), "haiku");
        assert_eq!(aliases.resolve("opus"), "sonnet");
    }

    #[test]
    fn empty_table_falls_back_to_builtin() {
        let aliases = ModelAliases::new(BTreeMap::new(), "", "haiku", "x");
        assert_eq!(aliases.resolve("sonnet"), "sonnet");
        assert_eq!(aliases.resolve("nope"), "haiku");
        assert_eq!(aliases.fallback_model(), "x");
    }

    #[test]
    fn normalization_is_substring_based() {
        assert_eq!(
            normalize_model_name("claude-sonnet-4-5-20250929"),
            "claude-sonnet-4"
        );
        assert_eq!(normalize_model_name("claude-3-opus"), "claude-opus-4");
        assert_eq!(normalize_model_name("haiku"), "claude-haiku-4");
        assert_eq!(normalize_model_name("gpt-4o"), "gpt-4o");
    }

    #[test]
    fn catalog_lists_canonical_models() {
        let list = ModelAliases::default().catalog(42);
        assert_eq!(list.object, "list");
        let ids: Vec<&str> = list.data.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, CANONICAL_MODELS);
        assert!(list.data.iter().all(|m| m.owned_by == "anthropic"));
        assert!(list.data.iter().all(|m| m.created == 42));
    }
}

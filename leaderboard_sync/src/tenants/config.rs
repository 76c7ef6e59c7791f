//! Tenant seed file: parsing, normalization, and loading.
//!
//! ```toml
//! [tenants.acme]
//! id = "tenant-acme"
//! name = "Acme Gaming"
//! casino = "stake"
//! api_config = { url = "https://partner.example/leaderboard.csv", apiKey = "..." }
//! settings = { theme = "dark" }
//! ```
//!
//! Table keys are slugs. Normalization trims every field, lowercases slugs and
//! casino tags, and rejects empty fields or duplicate slugs/ids. `api_config`
//! and `settings` default to `{}` and must be tables when present.

use std::{collections::HashSet, path::Path};

use anyhow::{Context, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::Tenant;

/// Top-level seed file mapping slugs to tenants.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TenantsFile {
    /// Map of slug -> tenant.
    pub tenants: IndexMap<String, TenantCfg>,
}

/// One tenant entry in the seed file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TenantCfg {
    /// Stable tenant id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Casino tag (e.g. "stake").
    pub casino: String,
    /// Adapter settings (`url`, optional `apiKey`).
    #[serde(default = "empty_object")]
    pub api_config: Value,
    /// Free-form settings.
    #[serde(default = "empty_object")]
    pub settings: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn required(field: &str, slug: &str, value: &str) -> anyhow::Result<String> {
    let value = value.trim();
    if value.is_empty() {
        bail!("tenant {slug:?}: {field} cannot be empty");
    }
    Ok(value.to_string())
}

/// Normalizes a parsed seed file into tenants, preserving file order.
///
/// Errors:
/// - Empty slug, id, name or casino after trimming
/// - Duplicate slug (after lowercasing) or duplicate id
/// - `api_config` / `settings` that are not tables
pub fn normalize_tenants(file: TenantsFile) -> anyhow::Result<Vec<Tenant>> {
    let mut slugs = HashSet::new();
    let mut ids = HashSet::new();
    let mut out = Vec::with_capacity(file.tenants.len());

    for (raw_slug, cfg) in file.tenants {
        let slug = raw_slug.trim().to_lowercase();
        if slug.is_empty() {
            bail!("tenant slug cannot be empty after trimming");
        }
        if !slugs.insert(slug.clone()) {
            bail!("duplicate tenant slug after normalization: {slug}");
        }

        let id = required("id", &slug, &cfg.id)?;
        if !ids.insert(id.clone()) {
            bail!("duplicate tenant id: {id}");
        }
        let name = required("name", &slug, &cfg.name)?;
        let casino = required("casino", &slug, &cfg.casino)?.to_lowercase();

        for (field, value) in [("api_config", &cfg.api_config), ("settings", &cfg.settings)] {
            if !value.is_object() {
                bail!("tenant {slug:?}: {field} must be a table");
            }
        }

        out.push(Tenant {
            id,
            slug,
            name,
            casino,
            api_config: cfg.api_config,
            settings: cfg.settings,
        });
    }
    Ok(out)
}

/// Parse + normalize from a TOML string.
pub fn load_tenants_str(s: &str) -> anyhow::Result<Vec<Tenant>> {
    let file: TenantsFile = toml::from_str(s).context("parsing tenants TOML")?;
    normalize_tenants(file)
}

/// Parse + normalize from a file path.
pub fn load_tenants_path(path: impl AsRef<Path>) -> anyhow::Result<Vec<Tenant>> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading tenants file {}", path.display()))?;
    load_tenants_str(&s).with_context(|| format!("loading tenants from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_and_defaults() {
        let tenants = load_tenants_str(
            r#"
            [tenants." Acme "]
            id = " tenant-acme "
            name = "Acme Gaming"
            casino = "Stake"
            api_config = { url = "https://partner.example/lb.csv", apiKey = "k" }

            [tenants.beta]
            id = "tenant-beta"
            name = "Beta"
            casino = "stake"
            settings = { theme = "dark" }
            "#,
        )
        .unwrap();

        assert_eq!(tenants.len(), 2);
        assert_eq!(tenants[0].slug, "acme");
        assert_eq!(tenants[0].id, "tenant-acme");
        assert_eq!(tenants[0].casino, "stake");
        assert_eq!(tenants[0].api_config["url"], "https://partner.example/lb.csv");
        assert_eq!(tenants[0].settings, serde_json::json!({}));
        assert_eq!(tenants[1].api_config, serde_json::json!({}));
        assert_eq!(tenants[1].settings["theme"], "dark");
    }

    #[test]
    fn rejects_duplicates_and_blanks() {
        let dup_slug = r#"
            [tenants.acme]
            id = "a"
            name = "A"
            casino = "stake"
            [tenants.ACME]
            id = "b"
            name = "B"
            casino = "stake"
        "#;
        assert!(load_tenants_str(dup_slug).is_err());

        let dup_id = r#"
            [tenants.one]
            id = "same"
            name = "A"
            casino = "stake"
            [tenants.two]
            id = "same"
            name = "B"
            casino = "stake"
        "#;
        let err = load_tenants_str(dup_id).unwrap_err();
        assert!(err.to_string().contains("duplicate tenant id"));

        let blank = r#"
            [tenants.one]
            id = "x"
            name = "  "
            casino = "stake"
        "#;
        assert!(load_tenants_str(blank).is_err());
    }

    #[test]
    fn unknown_fields_and_non_table_config_fail() {
        let unknown = r#"
            [tenants.one]
            id = "x"
            name = "X"
            casino = "stake"
            colour = "red"
        "#;
        assert!(load_tenants_str(unknown).is_err());

        let scalar = r#"
            [tenants.one]
            id = "x"
            name = "X"
            casino = "stake"
            api_config = "https://nope"
        "#;
        let err = load_tenants_str(scalar).unwrap_err();
        assert!(err.to_string().contains("api_config must be a table"));
    }
}

//! Configuration commands.
//!
//! `tessera config check` - Validate a tessera.yaml file.

use anyhow::Context;
use std::fmt::Write;
use std::path::Path;
use tessera_claims::ClaimTemplate;
use tessera_core::TesseraConfig;

/// Validate the configuration at `file`, including every tenant's claim
/// template. Key sources are listed but not resolved.
pub fn check(file: &Path) -> anyhow::Result<String> {
    let config = TesseraConfig::from_file(file)
        .with_context(|| format!("Invalid configuration in {}", file.display()))?;

    if let Some(template) = &config.defaults.claims_template {
        ClaimTemplate::parse(template).context("defaults.claims_template")?;
    }

    let mut tenants: Vec<&String> = config.tenants.keys().collect();
    tenants.sort();

    for tenant in &tenants {
        if let Some(template) = &config.tenants[*tenant].claims_template {
            ClaimTemplate::parse(template)
                .with_context(|| format!("tenants.{}.claims_template", tenant))?;
        }
    }

    let mut out = String::new();
    writeln!(out, "✔ Configuration is valid: {}", file.display())?;
    writeln!(out, "  Issuer: {}", config.issuer)?;
    write!(out, "  Tenant overrides: {}", tenants.len())?;

    let mut keyed: Vec<&String> = config.keys.tenants.keys().collect();
    keyed.sort();
    for tenant in keyed {
        let source = &config.keys.tenants[tenant];
        let has_current = source.private_key_env.is_some() || source.private_key_file.is_some();
        let has_previous =
            source.previous_private_key_env.is_some() || source.previous_private_key_file.is_some();

        if !has_current {
            write!(out, "\n⚠️  keys.tenants.{} has no private key source", tenant)?;
        }
        if has_previous && source.previous_retired_at.is_none() {
            write!(
                out,
                "\n⚠️  keys.tenants.{} previous key is ignored without previous_retired_at",
                tenant
            )?;
        }
    }

    Ok(out)
}

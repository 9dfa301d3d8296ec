//! Claim template commands.
//!
//! `tessera template check` - Validate a template and list the shortcodes it uses.

use anyhow::Context;
use std::fmt::Write;
use std::path::Path;
use tessera_claims::{ClaimTemplate, ProviderRegistry, SubjectSnapshot, resolve_template};

use super::read_structured;

/// Validate a template file. With `subject`, also resolve it against the
/// snapshot in that file and print the resulting claims.
pub fn check(file: &Path, subject: Option<&Path>) -> anyhow::Result<String> {
    let value = read_structured(file)?;
    let template = ClaimTemplate::parse(&value)
        .with_context(|| format!("Invalid claim template in {}", file.display()))?;

    let registry = ProviderRegistry::with_builtins();
    let shortcodes = template.referenced_shortcodes();
    let unknown: Vec<&str> = shortcodes
        .iter()
        .copied()
        .filter(|s| !registry.contains(s))
        .collect();

    let mut out = String::new();
    writeln!(
        out,
        "✔ Template is valid ({} claims)",
        template.bindings().len() + template.literals().len()
    )?;

    if shortcodes.is_empty() {
        write!(out, "  No shortcodes referenced")?;
    } else {
        write!(out, "  Shortcodes: {}", shortcodes.join(", "))?;
    }

    for name in &unknown {
        tracing::warn!(shortcode = %name, "Unknown shortcode");
        write!(out, "\n⚠️  Unknown shortcode '{{{{{}}}}}' resolves to null", name)?;
    }

    if let Some(subject_path) = subject {
        let snapshot: SubjectSnapshot = serde_json::from_value(read_structured(subject_path)?)
            .with_context(|| format!("Invalid subject snapshot in {}", subject_path.display()))?;
        let claims = resolve_template(&template, &registry, &snapshot);
        write!(
            out,
            "\n{}",
            serde_json::to_string_pretty(&serde_json::Value::Object(claims))?
        )?;
    }

    Ok(out)
}

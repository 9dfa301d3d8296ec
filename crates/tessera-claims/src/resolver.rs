//! Template resolution.

use serde_json::{Map, Value};

use crate::registry::ProviderRegistry;
use crate::snapshot::SubjectSnapshot;
use crate::template::{ClaimSource, ClaimTemplate, Segment};

/// Resolve every binding of `template` against `subject`.
///
/// A shortcode with no registered provider, or whose provider has nothing
/// for this subject, resolves to `null`; resolution never fails. Explicit
/// literals are applied last and win over computed values.
pub fn resolve_template(
    template: &ClaimTemplate,
    registry: &ProviderRegistry,
    subject: &SubjectSnapshot,
) -> Map<String, Value> {
    let mut claims = Map::new();

    for (claim, source) in template.bindings() {
        claims.insert(claim.clone(), resolve_value(source, registry, subject));
    }

    for (claim, value) in template.literals() {
        claims.insert(claim.clone(), value.clone());
    }

    tracing::trace!(
        tenant = %subject.tenant_id,
        claims = claims.len(),
        "Resolved claim template"
    );

    claims
}

/// Resolve a single claim source.
pub fn resolve_value(
    source: &ClaimSource,
    registry: &ProviderRegistry,
    subject: &SubjectSnapshot,
) -> Value {
    match source {
        ClaimSource::Shortcode(id) => substitute(id, registry, subject),
        ClaimSource::Interpolated(segments) => {
            let mut rendered = String::new();
            for segment in segments {
                match segment {
                    Segment::Text(text) => rendered.push_str(text),
                    Segment::Shortcode(id) => {
                        render_into(&mut rendered, substitute(id, registry, subject))
                    }
                }
            }
            Value::String(rendered)
        }
        ClaimSource::Literal(value) => value.clone(),
        ClaimSource::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, registry, subject)))
                .collect(),
        ),
        ClaimSource::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_value(item, registry, subject))
                .collect(),
        ),
    }
}

fn substitute(identifier: &str, registry: &ProviderRegistry, subject: &SubjectSnapshot) -> Value {
    match registry.get(identifier) {
        Some(provider) => provider.substitute(subject).unwrap_or(Value::Null),
        None => {
            tracing::debug!(identifier = %identifier, "No provider registered for shortcode");
            Value::Null
        }
    }
}

fn render_into(out: &mut String, value: Value) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(&s),
        other => out.push_str(&other.to_string()),
    }
}

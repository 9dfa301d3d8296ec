//! Claim template parsing.

use serde_json::{Map, Value};

use crate::error::ClaimsError;

/// Claims the issuer stamps itself. Templates cannot bind them.
pub const RESERVED_CLAIMS: [&str; 5] = ["iss", "sub", "exp", "iat", "sid"];

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// One piece of an interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Shortcode(String),
}

/// Where a claim's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimSource {
    /// `"{{user.id}}"`: the provider's value, typed.
    Shortcode(String),
    /// A string mixing text and shortcodes.
    Interpolated(Vec<Segment>),
    /// A fixed value.
    Literal(Value),
    Object(Vec<(String, ClaimSource)>),
    Array(Vec<ClaimSource>),
}

impl ClaimSource {
    fn parse(claim: &str, value: &Value) -> Result<Self, ClaimsError> {
        match value {
            Value::String(s) => parse_string(claim, s),
            Value::Object(map) => {
                let mut fields = Vec::with_capacity(map.len());
                for (key, nested) in map {
                    fields.push((key.clone(), Self::parse(claim, nested)?));
                }
                Ok(Self::Object(fields))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| Self::parse(claim, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Array),
            other => Ok(Self::Literal(other.clone())),
        }
    }

    fn collect_shortcodes<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Shortcode(id) => out.push(id),
            Self::Interpolated(segments) => {
                for segment in segments {
                    if let Segment::Shortcode(id) = segment {
                        out.push(id);
                    }
                }
            }
            Self::Literal(_) => {}
            Self::Object(fields) => {
                for (_, source) in fields {
                    source.collect_shortcodes(out);
                }
            }
            Self::Array(items) => {
                for item in items {
                    item.collect_shortcodes(out);
                }
            }
        }
    }
}

fn parse_string(claim: &str, s: &str) -> Result<ClaimSource, ClaimsError> {
    if !s.contains(OPEN) {
        return Ok(ClaimSource::Literal(Value::String(s.to_string())));
    }

    let mut segments = Vec::new();
    let mut rest = s;

    while let Some(start) = rest.find(OPEN) {
        if start > 0 {
            segments.push(Segment::Text(rest[..start].to_string()));
        }

        let after_open = &rest[start + OPEN.len()..];
        let end = after_open
            .find(CLOSE)
            .ok_or_else(|| ClaimsError::UnterminatedShortcode {
                claim: claim.to_string(),
            })?;

        let identifier = after_open[..end].trim();
        if identifier.is_empty() {
            return Err(ClaimsError::EmptyShortcode {
                claim: claim.to_string(),
            });
        }
        segments.push(Segment::Shortcode(identifier.to_string()));

        rest = &after_open[end + CLOSE.len()..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }

    match segments.as_slice() {
        [Segment::Shortcode(id)] => Ok(ClaimSource::Shortcode(id.clone())),
        _ => Ok(ClaimSource::Interpolated(segments)),
    }
}

fn check_reserved(claim: &str) -> Result<(), ClaimsError> {
    if RESERVED_CLAIMS.contains(&claim) {
        return Err(ClaimsError::ReservedClaimCollision {
            claim: claim.to_string(),
        });
    }
    Ok(())
}

/// A validated claim template.
///
/// Bindings keep their declaration order. Explicit literals set through
/// [`ClaimTemplateBuilder::literal`] win over computed bindings of the same
/// name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimTemplate {
    bindings: Vec<(String, ClaimSource)>,
    literals: Vec<(String, Value)>,
}

impl ClaimTemplate {
    /// Parse a tenant's template JSON.
    ///
    /// Fails if the template is not an object, binds a reserved claim, or
    /// contains a broken shortcode reference.
    pub fn parse(template: &Value) -> Result<Self, ClaimsError> {
        let map = template.as_object().ok_or(ClaimsError::NotAnObject {
            found: json_type(template),
        })?;

        let mut builder = Self::builder();
        for (claim, value) in map {
            builder = builder.source(claim, ClaimSource::parse(claim, value)?);
        }
        builder.build()
    }

    /// Parse a template from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ClaimsError> {
        let value: Value = serde_json::from_str(json)?;
        Self::parse(&value)
    }

    pub fn builder() -> ClaimTemplateBuilder {
        ClaimTemplateBuilder::default()
    }

    pub fn bindings(&self) -> &[(String, ClaimSource)] {
        &self.bindings
    }

    pub fn literals(&self) -> &[(String, Value)] {
        &self.literals
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.literals.is_empty()
    }

    /// Every shortcode identifier referenced, deduplicated and sorted.
    pub fn referenced_shortcodes(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for (_, source) in &self.bindings {
            source.collect_shortcodes(&mut out);
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Render the template back to its JSON form.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (claim, source) in &self.bindings {
            map.insert(claim.clone(), source_to_value(source));
        }
        for (claim, value) in &self.literals {
            map.insert(claim.clone(), value.clone());
        }
        Value::Object(map)
    }
}

fn source_to_value(source: &ClaimSource) -> Value {
    match source {
        ClaimSource::Shortcode(id) => Value::String(format!("{{{{{}}}}}", id)),
        ClaimSource::Interpolated(segments) => {
            let mut s = String::new();
            for segment in segments {
                match segment {
                    Segment::Text(text) => s.push_str(text),
                    Segment::Shortcode(id) => {
                        s.push_str(OPEN);
                        s.push_str(id);
                        s.push_str(CLOSE);
                    }
                }
            }
            Value::String(s)
        }
        ClaimSource::Literal(value) => value.clone(),
        ClaimSource::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), source_to_value(v)))
                .collect(),
        ),
        ClaimSource::Array(items) => Value::Array(items.iter().map(source_to_value).collect()),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Builder for [`ClaimTemplate`]. Reserved names are checked in `build`.
#[derive(Debug, Default)]
pub struct ClaimTemplateBuilder {
    bindings: Vec<(String, ClaimSource)>,
    literals: Vec<(String, Value)>,
}

impl ClaimTemplateBuilder {
    /// Bind a claim to a shortcode.
    pub fn bind(self, claim: impl Into<String>, identifier: impl Into<String>) -> Self {
        self.source(claim, ClaimSource::Shortcode(identifier.into()))
    }

    /// Bind a claim to any source. A later binding of the same name replaces
    /// the earlier one in place.
    pub fn source(mut self, claim: impl Into<String>, source: ClaimSource) -> Self {
        let claim = claim.into();
        match self.bindings.iter_mut().find(|(name, _)| *name == claim) {
            Some(existing) => existing.1 = source,
            None => self.bindings.push((claim, source)),
        }
        self
    }

    /// Set an explicit literal. Literals win over computed bindings.
    pub fn literal(mut self, claim: impl Into<String>, value: Value) -> Self {
        let claim = claim.into();
        match self.literals.iter_mut().find(|(name, _)| *name == claim) {
            Some(existing) => existing.1 = value,
            None => self.literals.push((claim, value)),
        }
        self
    }

    pub fn build(self) -> Result<ClaimTemplate, ClaimsError> {
        for (claim, _) in &self.bindings {
            check_reserved(claim)?;
        }
        for (claim, _) in &self.literals {
            check_reserved(claim)?;
        }

        Ok(ClaimTemplate {
            bindings: self.bindings,
            literals: self.literals,
        })
    }
}

//! # tessera-claims
//!
//! Tenant-configurable claim templates for session tokens.
//!
//! A tenant configures a JSON object whose values reference named providers
//! ("shortcodes") such as `{{user.id}}` or `{{org.role}}`. At issue time each
//! binding is filled in from an immutable [`SubjectSnapshot`] of the user,
//! session and active organization membership.
//!
//! ## Template values
//!
//! | Template value | Resolves to |
//! |----------------|-------------|
//! | `"{{user.id}}"` | the provider's typed value, or `null` |
//! | `"{{user.first_name}} / {{org.slug}}"` | a string; `null` parts render empty |
//! | `"static"`, `42`, `true` | the literal itself |
//! | nested object or array | resolved recursively |
//!
//! Reserved claims (`iss`, `sub`, `exp`, `iat`, `sid`) are stamped by the
//! issuer. A template that binds one is rejected when it is parsed, never at
//! issue time.
//!
//! ## Example Usage
//!
//! ```rust
//! use tessera_claims::{ClaimTemplate, ProviderRegistry, SubjectSnapshot, UserSnapshot};
//!
//! let template = ClaimTemplate::parse(&serde_json::json!({
//!     "uid": "{{user.id}}",
//!     "role": "{{org.role}}",
//! }))
//! .unwrap();
//!
//! let registry = ProviderRegistry::with_builtins();
//! let subject = SubjectSnapshot::new("ins_1", UserSnapshot::new("user_1"));
//!
//! let claims = tessera_claims::resolve_template(&template, &registry, &subject);
//! assert_eq!(claims["uid"], "user_1");
//! assert!(claims["role"].is_null());
//! ```

pub mod error;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod snapshot;
pub mod template;

pub use error::ClaimsError;
pub use provider::{ClaimProvider, FnProvider, Shortcode};
pub use registry::ProviderRegistry;
pub use resolver::{resolve_template, resolve_value};
pub use snapshot::{OrganizationMembership, SessionSnapshot, SubjectSnapshot, UserSnapshot};
pub use template::{ClaimSource, ClaimTemplate, ClaimTemplateBuilder, RESERVED_CLAIMS, Segment};

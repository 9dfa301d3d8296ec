//! The read-only view of the subject that providers resolve against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything a claim provider may read for one token.
///
/// Built once per issue call by the request-context collaborators and never
/// mutated by this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectSnapshot {
    pub tenant_id: String,
    pub user: UserSnapshot,
    #[serde(default)]
    pub session: Option<SessionSnapshot>,
    /// Membership in the session's active organization, if any.
    #[serde(default)]
    pub organization: Option<OrganizationMembership>,
}

impl SubjectSnapshot {
    pub fn new(tenant_id: impl Into<String>, user: UserSnapshot) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user,
            session: None,
            organization: None,
        }
    }

    pub fn with_session(mut self, session: SessionSnapshot) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_organization(mut self, organization: OrganizationMembership) -> Self {
        self.organization = Some(organization);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSnapshot {
    pub id: String,
    pub external_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub primary_email_address: Option<String>,
    pub email_verified: bool,
    pub primary_phone_number: Option<String>,
    pub phone_number_verified: bool,
    pub image_url: Option<String>,
    pub public_metadata: Value,
    pub unsafe_metadata: Value,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub totp_enabled: bool,
    pub backup_code_enabled: bool,
}

impl UserSnapshot {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            public_metadata: Value::Object(Default::default()),
            unsafe_metadata: Value::Object(Default::default()),
            ..Default::default()
        }
    }

    /// First and last name joined by a space, skipping missing parts.
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    pub fn two_factor_enabled(&self) -> bool {
        self.totp_enabled || self.backup_code_enabled
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    /// Impersonation actor, when an admin acts on the user's behalf.
    #[serde(default)]
    pub actor: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationMembership {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
    pub image_url: Option<String>,
    pub role: String,
    pub permissions: Vec<String>,
    pub public_metadata: Value,
    pub membership_public_metadata: Value,
}

//! Claim providers ("shortcodes").

use serde_json::{Value, json};

use crate::snapshot::SubjectSnapshot;

/// A named, side-effect-free claim value source.
///
/// `substitute` returns `None` when the value does not exist for this
/// subject (no active organization, no phone number); the resolver renders
/// that as `null`.
pub trait ClaimProvider: Send + Sync {
    /// Stable dotted identifier, e.g. `user.id`.
    fn identifier(&self) -> &str;

    fn substitute(&self, subject: &SubjectSnapshot) -> Option<Value>;
}

/// The builtin shortcode catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shortcode {
    UserId,
    UserExternalId,
    UserFirstName,
    UserLastName,
    UserFullName,
    UserUsername,
    UserPrimaryEmailAddress,
    UserEmailVerified,
    UserPrimaryPhoneNumber,
    UserPhoneNumberVerified,
    UserImageUrl,
    UserHasImage,
    UserPublicMetadata,
    UserUnsafeMetadata,
    UserCreatedAt,
    UserUpdatedAt,
    UserTwoFactorEnabled,
    UserTotpEnabled,
    UserBackupCodeEnabled,
    SessionId,
    SessionActor,
    OrgId,
    OrgName,
    OrgSlug,
    OrgImageUrl,
    OrgRole,
    OrgPermissions,
    OrgPublicMetadata,
    OrgMembershipPublicMetadata,
}

impl Shortcode {
    pub const ALL: [Shortcode; 29] = [
        Self::UserId,
        Self::UserExternalId,
        Self::UserFirstName,
        Self::UserLastName,
        Self::UserFullName,
        Self::UserUsername,
        Self::UserPrimaryEmailAddress,
        Self::UserEmailVerified,
        Self::UserPrimaryPhoneNumber,
        Self::UserPhoneNumberVerified,
        Self::UserImageUrl,
        Self::UserHasImage,
        Self::UserPublicMetadata,
        Self::UserUnsafeMetadata,
        Self::UserCreatedAt,
        Self::UserUpdatedAt,
        Self::UserTwoFactorEnabled,
        Self::UserTotpEnabled,
        Self::UserBackupCodeEnabled,
        Self::SessionId,
        Self::SessionActor,
        Self::OrgId,
        Self::OrgName,
        Self::OrgSlug,
        Self::OrgImageUrl,
        Self::OrgRole,
        Self::OrgPermissions,
        Self::OrgPublicMetadata,
        Self::OrgMembershipPublicMetadata,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserId => "user.id",
            Self::UserExternalId => "user.external_id",
            Self::UserFirstName => "user.first_name",
            Self::UserLastName => "user.last_name",
            Self::UserFullName => "user.full_name",
            Self::UserUsername => "user.username",
            Self::UserPrimaryEmailAddress => "user.primary_email_address",
            Self::UserEmailVerified => "user.email_verified",
            Self::UserPrimaryPhoneNumber => "user.primary_phone_number",
            Self::UserPhoneNumberVerified => "user.phone_number_verified",
            Self::UserImageUrl => "user.image_url",
            Self::UserHasImage => "user.has_image",
            Self::UserPublicMetadata => "user.public_metadata",
            Self::UserUnsafeMetadata => "user.unsafe_metadata",
            Self::UserCreatedAt => "user.created_at",
            Self::UserUpdatedAt => "user.updated_at",
            Self::UserTwoFactorEnabled => "user.two_factor_enabled",
            Self::UserTotpEnabled => "user.totp_enabled",
            Self::UserBackupCodeEnabled => "user.backup_code_enabled",
            Self::SessionId => "session.id",
            Self::SessionActor => "session.actor",
            Self::OrgId => "org.id",
            Self::OrgName => "org.name",
            Self::OrgSlug => "org.slug",
            Self::OrgImageUrl => "org.image_url",
            Self::OrgRole => "org.role",
            Self::OrgPermissions => "org.permissions",
            Self::OrgPublicMetadata => "org.public_metadata",
            Self::OrgMembershipPublicMetadata => "org.membership_public_metadata",
        }
    }

    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == identifier)
    }
}

impl std::fmt::Display for Shortcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn opt_str(value: &Option<String>) -> Option<Value> {
    value.as_ref().map(|v| Value::String(v.clone()))
}

impl ClaimProvider for Shortcode {
    fn identifier(&self) -> &str {
        self.as_str()
    }

    fn substitute(&self, subject: &SubjectSnapshot) -> Option<Value> {
        let user = &subject.user;
        let org = subject.organization.as_ref();

        match self {
            Self::UserId => Some(json!(user.id)),
            Self::UserExternalId => opt_str(&user.external_id),
            Self::UserFirstName => opt_str(&user.first_name),
            Self::UserLastName => opt_str(&user.last_name),
            Self::UserFullName => user.full_name().map(Value::String),
            Self::UserUsername => opt_str(&user.username),
            Self::UserPrimaryEmailAddress => opt_str(&user.primary_email_address),
            Self::UserEmailVerified => Some(json!(user.email_verified)),
            Self::UserPrimaryPhoneNumber => opt_str(&user.primary_phone_number),
            Self::UserPhoneNumberVerified => Some(json!(user.phone_number_verified)),
            Self::UserImageUrl => opt_str(&user.image_url),
            Self::UserHasImage => Some(json!(user.image_url.is_some())),
            Self::UserPublicMetadata => Some(user.public_metadata.clone()),
            Self::UserUnsafeMetadata => Some(user.unsafe_metadata.clone()),
            Self::UserCreatedAt => user.created_at.map(|t| json!(t.timestamp())),
            Self::UserUpdatedAt => user.updated_at.map(|t| json!(t.timestamp())),
            Self::UserTwoFactorEnabled => Some(json!(user.two_factor_enabled())),
            Self::UserTotpEnabled => Some(json!(user.totp_enabled)),
            Self::UserBackupCodeEnabled => Some(json!(user.backup_code_enabled)),
            Self::SessionId => subject.session.as_ref().map(|s| json!(s.id)),
            Self::SessionActor => subject.session.as_ref().and_then(|s| s.actor.clone()),
            Self::OrgId => org.map(|o| json!(o.id)),
            Self::OrgName => org.map(|o| json!(o.name)),
            Self::OrgSlug => org.and_then(|o| opt_str(&o.slug)),
            Self::OrgImageUrl => org.and_then(|o| opt_str(&o.image_url)),
            Self::OrgRole => org.map(|o| json!(o.role)),
            Self::OrgPermissions => org.map(|o| json!(o.permissions)),
            Self::OrgPublicMetadata => org.map(|o| o.public_metadata.clone()),
            Self::OrgMembershipPublicMetadata => org.map(|o| o.membership_public_metadata.clone()),
        }
    }
}

/// A provider backed by a closure, for tenant-specific shortcodes.
pub struct FnProvider<F> {
    identifier: String,
    substitute: F,
}

impl<F> FnProvider<F>
where
    F: Fn(&SubjectSnapshot) -> Option<Value> + Send + Sync,
{
    pub fn new(identifier: impl Into<String>, substitute: F) -> Self {
        Self {
            identifier: identifier.into(),
            substitute,
        }
    }
}

impl<F> ClaimProvider for FnProvider<F>
where
    F: Fn(&SubjectSnapshot) -> Option<Value> + Send + Sync,
{
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn substitute(&self, subject: &SubjectSnapshot) -> Option<Value> {
        (self.substitute)(subject)
    }
}

impl<F> std::fmt::Debug for FnProvider<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProvider")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

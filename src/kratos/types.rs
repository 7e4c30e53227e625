//! Wire types for the subset of the Kratos API the dashboard uses.
//! Fields follow the Kratos JSON names; optional data defaults when absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identity schema used for every identity the dashboard creates.
pub const DEFAULT_SCHEMA_ID: &str = "default";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityState {
    #[default]
    Active,
    Inactive,
}

impl IdentityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityState::Active => "active",
            IdentityState::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traits {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_name")]
    pub name: Option<Name>,
}

/// Identities written by other tools may carry `name` as a bare string or in
/// some other shape. A string becomes the first name; anything else that is
/// not a `{first, last}` object is dropped rather than failing the identity.
fn lenient_name<'de, D>(deserializer: D) -> Result<Option<Name>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(Name { first: Some(s), last: None }),
        Some(v @ Value::Object(_)) => serde_json::from_value(v).ok(),
        _ => None,
    })
}

impl Traits {
    /// Traits for a dashboard form submission. Blank first names fall back to
    /// the local part of the email, blank last names to "".
    pub fn from_form(email: &str, first: Option<&str>, last: Option<&str>) -> Self {
        let first = first
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| email_local_part(email).to_string());
        let last = last.map(str::trim).unwrap_or("").to_string();
        Traits { email: email.to_string(), name: Some(Name { first: Some(first), last: Some(last) }) }
    }

    pub fn first_name(&self) -> Option<&str> {
        self.name.as_ref().and_then(|n| n.first.as_deref()).filter(|s| !s.is_empty())
    }

    pub fn last_name(&self) -> Option<&str> {
        self.name.as_ref().and_then(|n| n.last.as_deref()).filter(|s| !s.is_empty())
    }
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiableAddress {
    #[serde(default)]
    pub id: String,
    pub value: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub via: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryAddress {
    #[serde(default)]
    pub id: String,
    pub value: String,
    #[serde(default)]
    pub via: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub schema_id: String,
    #[serde(default)]
    pub schema_url: String,
    #[serde(default)]
    pub state: IdentityState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_changed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub traits: Traits,
    #[serde(default)]
    pub verifiable_addresses: Vec<VerifiableAddress>,
    #[serde(default)]
    pub recovery_addresses: Vec<RecoveryAddress>,
    #[serde(default)]
    pub metadata_public: Option<Value>,
    #[serde(default)]
    pub metadata_admin: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn is_active(&self) -> bool {
        self.state == IdentityState::Active
    }

    /// At least one verifiable address has been verified.
    pub fn is_verified(&self) -> bool {
        self.verifiable_addresses.iter().any(|a| a.verified)
    }
}

/// Filtered listing result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityList {
    pub identities: Vec<Identity>,
    pub total_count: usize,
}

/// Every identity gathered by a paged walk of the admin listing.
#[derive(Debug, Clone, Default)]
pub struct IdentityScan {
    pub identities: Vec<Identity>,
    pub pages: usize,
    /// The walk hit its page limit while the listing still had more rows.
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordConfig {
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordCredential {
    pub config: PasswordConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<PasswordCredential>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiableAddressRequest {
    pub value: String,
    pub verified: bool,
    pub via: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryAddressRequest {
    pub value: String,
    pub via: String,
}

/// Body of `POST /admin/identities`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIdentityRequest {
    pub schema_id: String,
    pub traits: Traits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verifiable_addresses: Vec<VerifiableAddressRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recovery_addresses: Vec<RecoveryAddressRequest>,
}

impl CreateIdentityRequest {
    /// A password identity under the default schema whose email is seeded as
    /// an unverified verifiable address and as a recovery address.
    pub fn with_password(traits: Traits, password: &str) -> Self {
        let email = traits.email.clone();
        Self {
            schema_id: DEFAULT_SCHEMA_ID.to_string(),
            traits,
            credentials: Some(Credentials {
                password: Some(PasswordCredential { config: PasswordConfig { password: password.to_string() } }),
            }),
            verifiable_addresses: vec![VerifiableAddressRequest { value: email.clone(), verified: false, via: "email".into() }],
            recovery_addresses: vec![RecoveryAddressRequest { value: email, via: "email".into() }],
        }
    }
}

/// Body of `PUT /admin/identities/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateIdentityRequest {
    pub schema_id: String,
    pub traits: Traits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<IdentityState>,
}

impl UpdateIdentityRequest {
    pub fn traits_only(traits: Traits) -> Self {
        Self { schema_id: DEFAULT_SCHEMA_ID.to_string(), traits, state: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiNodeAttributes {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiNode {
    #[serde(default)]
    pub attributes: UiNodeAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiMessage {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiContainer {
    #[serde(default)]
    pub nodes: Vec<UiNode>,
    #[serde(default)]
    pub messages: Vec<UiMessage>,
}

/// Self-service login flow as returned by `GET /self-service/login/api`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginFlow {
    pub id: String,
    #[serde(default)]
    pub ui: UiContainer,
}

impl LoginFlow {
    /// Value of the `csrf_token` node, when the flow carries one.
    pub fn csrf_token(&self) -> Option<String> {
        self.ui
            .nodes
            .iter()
            .find(|n| n.attributes.name.as_deref() == Some("csrf_token"))
            .and_then(|n| n.attributes.value.as_ref())
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSubmission {
    pub method: String,
    pub identifier: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
}

impl LoginSubmission {
    pub fn password(identifier: &str, password: &str, csrf_token: Option<String>) -> Self {
        Self { method: "password".into(), identifier: identifier.to_string(), password: password.to_string(), csrf_token }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

/// Successful login submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginResult {
    #[serde(default)]
    pub session_token: Option<String>,
    pub session: SessionInfo,
}

impl LoginResult {
    /// Token to hand to the browser: the API session token, or the session
    /// id when the identity service did not issue one.
    pub fn token(&self) -> &str {
        self.session_token.as_deref().filter(|t| !t.is_empty()).unwrap_or(&self.session.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutFlow {
    pub logout_token: String,
    #[serde(default)]
    pub logout_url: String,
}

/// Response of `GET /sessions/whoami`.
pub type WhoAmI = SessionInfo;

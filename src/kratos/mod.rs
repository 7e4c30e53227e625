//! Thin client for the Ory Kratos admin and public REST APIs.
//! One request in, one JSON value or [`KratosError`] out. No retries, no caching.

mod client;
mod error;
mod types;

pub use client::{KratosClient, ListParams};
pub use error::KratosError;
pub use types::{
    Credentials, CreateIdentityRequest, Identity, IdentityList, IdentityScan, IdentityState, LoginFlow, LoginResult,
    LoginSubmission, LogoutFlow, Name, PasswordConfig, PasswordCredential, RecoveryAddress,
    RecoveryAddressRequest, SessionInfo, Traits, UiContainer, UiMessage, UiNode, UiNodeAttributes,
    UpdateIdentityRequest, VerifiableAddress, VerifiableAddressRequest, WhoAmI, DEFAULT_SCHEMA_ID,
};

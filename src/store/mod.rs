//! Tip page records and the store contract.
//!
//! A record is created once, read any number of times, and never updated
//! or deleted. Both backends (file-per-token and the device-local sled
//! store) implement the same [`TipPageStore`] contract, so the HTTP
//! boundary and the client resolution policy are backend-agnostic.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::token;

pub mod fs;
pub mod local;

/// Message stored when the creator leaves it absent or blank.
pub const DEFAULT_MESSAGE: &str = "Support my work anonymously";

/// Regeneration attempts before a create gives up. With a 128-bit token
/// space even one retry is astronomically unlikely.
const MAX_TOKEN_ATTEMPTS: u32 = 8;

/// Errors from the record store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Display name empty or no payment method enabled.
    #[error("Invalid data")]
    InvalidData,
    /// Token does not resolve to any record.
    #[error("Tip page not found")]
    NotFound,
    #[error("token space exhausted after {0} attempts")]
    TokenSpaceExhausted(u32),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("local database error: {0}")]
    Db(#[from] sled::Error),
}

/// Supported payment methods
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Bitcoin,
    Lightning,
    Monero,
    Venmo,
    Cashapp,
    Paypal,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Bitcoin => "bitcoin",
            PaymentKind::Lightning => "lightning",
            PaymentKind::Monero => "monero",
            PaymentKind::Venmo => "venmo",
            PaymentKind::Cashapp => "cashapp",
            PaymentKind::Paypal => "paypal",
        }
    }

    /// Crypto methods carry an `address`, account-handle methods a `username`.
    pub fn uses_address(&self) -> bool {
        matches!(
            self,
            PaymentKind::Bitcoin | PaymentKind::Lightning | PaymentKind::Monero
        )
    }
}

/// Payload for one payment method entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl PaymentMethod {
    pub fn address(addr: impl Into<String>) -> Self {
        Self {
            enabled: true,
            address: Some(addr.into()),
            username: None,
        }
    }

    pub fn username(name: impl Into<String>) -> Self {
        Self {
            enabled: true,
            address: None,
            username: Some(name.into()),
        }
    }
}

/// Creation request as submitted by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipPageInput {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub payment_methods: BTreeMap<PaymentKind, PaymentMethod>,
}

/// Full stored record. The token itself is the key, not a field, so the
/// stored unit is exactly what a read discloses plus the creation stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipPage {
    pub display_name: String,
    pub message: String,
    pub payment_methods: BTreeMap<PaymentKind, PaymentMethod>,
    pub created_at: DateTime<Utc>,
}

/// Public read view: every field meant for disclosure, nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipPageView {
    pub display_name: String,
    pub message: String,
    pub payment_methods: BTreeMap<PaymentKind, PaymentMethod>,
}

impl From<TipPage> for TipPageView {
    fn from(page: TipPage) -> Self {
        Self {
            display_name: page.display_name,
            message: page.message,
            payment_methods: page.payment_methods,
        }
    }
}

/// Validate a creation request without consuming it.
///
/// Disabled entries do not count toward the at-least-one-method rule.
pub fn validate(input: &TipPageInput) -> Result<(), StoreError> {
    if input.display_name.trim().is_empty() {
        return Err(StoreError::InvalidData);
    }
    if !input.payment_methods.values().any(|m| m.enabled) {
        return Err(StoreError::InvalidData);
    }
    Ok(())
}

/// Validate and normalize a request into the record that will be stored:
/// trimmed display name, defaulted message, disabled entries dropped,
/// creation time stamped.
pub(crate) fn build_record(input: TipPageInput) -> Result<TipPage, StoreError> {
    validate(&input)?;
    let message = match input.message.as_deref().map(str::trim) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => DEFAULT_MESSAGE.to_string(),
    };
    Ok(TipPage {
        display_name: input.display_name.trim().to_string(),
        message,
        payment_methods: input
            .payment_methods
            .into_iter()
            .filter(|(_, m)| m.enabled)
            .collect(),
        created_at: Utc::now(),
    })
}

/// Create/read contract shared by every backend.
pub trait TipPageStore: Send + Sync {
    /// Validate, assign a fresh token and durably persist the record.
    /// Returns the token. Never overwrites an existing record.
    fn create(&self, input: TipPageInput) -> Result<String, StoreError>;

    /// Exact-match, case-sensitive lookup. Read-only.
    fn get(&self, token: &str) -> Result<TipPage, StoreError>;
}

/// Shared create loop: regenerate on the (astronomically rare) collision,
/// never overwrite. `persist` returns `Ok(false)` when the token is
/// already taken.
pub(crate) fn create_with_fresh_token<F>(
    record: &TipPage,
    mut persist: F,
) -> Result<String, StoreError>
where
    F: FnMut(&str, &TipPage) -> Result<bool, StoreError>,
{
    for _ in 0..MAX_TOKEN_ATTEMPTS {
        let token = token::generate();
        if persist(&token, record)? {
            return Ok(token);
        }
        tracing::warn!("[STORE] token collision, regenerating");
    }
    Err(StoreError::TokenSpaceExhausted(MAX_TOKEN_ATTEMPTS))
}

//! Access-token definitions.

use common::{unit, DateTimeOf};
#[cfg(doc)]
use common::DateTime;
use derive_more::AsRef;
use serde::Deserialize;

use super::market;

/// Bearer token issued by the external authentication provider.
///
/// Opaque here: this service only verifies its signature and reads the
/// claims.
#[derive(AsRef, Clone, Debug)]
#[as_ref(forward)]
pub struct Token(String);

impl Token {
    /// Creates a new [`Token`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `token` was extracted from an
    /// `Authorization` header (or an equivalent trusted place) verbatim.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

/// Verified claims of a [`Token`].
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Claims {
    /// ID of the authenticated investor.
    #[serde(rename = "sub")]
    pub owner_id: market::OwnerId,

    /// [`DateTime`] when the [`Token`] expires.
    #[serde(
        rename = "exp",
        with = "common::datetime::serde::unix_timestamp"
    )]
    pub expires_at: ExpirationDateTime,
}

/// [`DateTime`] when a [`Token`] expires.
pub type ExpirationDateTime = DateTimeOf<(Claims, unit::Expiration)>;

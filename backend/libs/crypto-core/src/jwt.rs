/// Token codec for Storefront identity tokens
///
/// Tokens are HS256 JWTs minted and verified only by the identity service. The
/// signing secret lives inside a [`TokenCodec`] built once at startup and handed
/// to whoever needs it; nothing in this module reads global state.
///
/// ## Verification order
///
/// 1. Structure (three segments, decodable header) - otherwise `malformed`
/// 2. Signature, compared in constant time - otherwise `signature-invalid`
/// 3. Claim shape - otherwise `malformed`
/// 4. `iat` against the verifier's clock (with a small skew grace) - `not-yet-valid`
/// 5. `exp` against the verifier's clock, strict - `expired`
///
/// ## Usage
///
/// ```rust
/// use chrono::{Duration, Utc};
/// use crypto_core::jwt::{Principal, TokenCodec, ValidationOutcome};
///
/// let codec = TokenCodec::new(b"0123456789abcdef0123456789abcdef", Duration::hours(1)).unwrap();
/// let principal = Principal::new(5, "ada@example.com", false).unwrap();
/// let now = Utc::now();
/// let token = codec.encode(&principal, now).unwrap();
/// assert!(matches!(codec.decode(&token, now), ValidationOutcome::Verified(_)));
/// ```
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail};

// ============================================================================
// Constants
// ============================================================================

/// Minimum secret length in bytes (256 bits for HS256)
pub const MIN_SECRET_LENGTH: usize = 32;

/// Default grace applied to `iat` when the issuer's clock runs ahead of ours
pub const DEFAULT_CLOCK_SKEW_SECONDS: i64 = 5;

/// Longest lifetime a codec accepts.
pub const MAX_LIFETIME_SECONDS: i64 = 366 * 24 * 60 * 60;

/// Widest not-yet-valid grace a codec accepts.
pub const MAX_CLOCK_SKEW_SECONDS: i64 = 60 * 60;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Trailing metadata key carrying the error class of a failed validation
pub const AUTH_ERROR_METADATA_KEY: &str = "x-auth-error";

/// Trailing metadata key carrying the [`RejectReason`] of a rejected token
pub const REJECT_REASON_METADATA_KEY: &str = "x-auth-reject-reason";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("JWT secret is too short: {length} bytes (minimum {MIN_SECRET_LENGTH})")]
    WeakSecret { length: usize },

    #[error("token lifetime must be between one second and {MAX_LIFETIME_SECONDS} seconds")]
    InvalidLifetime,

    #[error("clock skew must be between zero and {MAX_CLOCK_SKEW_SECONDS} seconds")]
    InvalidClockSkew,

    #[error("invalid principal: {0}")]
    InvalidPrincipal(#[from] validator::ValidationErrors),

    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

// ============================================================================
// Data Structures
// ============================================================================

/// Issuance input: the identity a fresh token should describe.
///
/// This is *not* a trusted claims object. Trusted [`Claims`] only come out of
/// [`TokenCodec::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct Principal {
    #[validate(range(min = 1))]
    subject_id: i32,
    #[validate(email)]
    contact: String,
    privileged: bool,
}

impl Principal {
    pub fn new(
        subject_id: i32,
        contact: impl Into<String>,
        privileged: bool,
    ) -> Result<Self, TokenError> {
        let principal = Self {
            subject_id,
            contact: contact.into(),
            privileged,
        };
        principal.validate()?;
        Ok(principal)
    }

    pub fn subject_id(&self) -> i32 {
        self.subject_id
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }

    pub fn privileged(&self) -> bool {
        self.privileged
    }
}

/// Verified identity claims recovered from a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    subject_id: i32,
    contact: String,
    privileged: bool,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Claims {
    pub fn subject_id(&self) -> i32 {
        self.subject_id
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }

    pub fn privileged(&self) -> bool {
        self.privileged
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// JSON body of the token as it appears on the wire.
#[derive(Debug, Serialize, Deserialize)]
struct TokenBody {
    id: i32,
    email: String,
    is_admin: bool,
    iat: i64,
    exp: i64,
}

/// Why a token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    Malformed,
    SignatureInvalid,
    Expired,
    NotYetValid,
    /// Signature and clock checks passed but the subject no longer exists.
    Revoked,
}

impl RejectReason {
    pub const ALL: [RejectReason; 5] = [
        RejectReason::Malformed,
        RejectReason::SignatureInvalid,
        RejectReason::Expired,
        RejectReason::NotYetValid,
        RejectReason::Revoked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Malformed => "malformed",
            RejectReason::SignatureInvalid => "signature-invalid",
            RejectReason::Expired => "expired",
            RejectReason::NotYetValid => "not-yet-valid",
            RejectReason::Revoked => "revoked",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown rejection reason: {0}")]
pub struct UnknownRejectReason(pub String);

impl FromStr for RejectReason {
    type Err = UnknownRejectReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RejectReason::ALL
            .into_iter()
            .find(|reason| reason.as_str() == s)
            .ok_or_else(|| UnknownRejectReason(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Verified(Claims),
    Rejected(RejectReason),
}

impl ValidationOutcome {
    pub fn into_result(self) -> Result<Claims, RejectReason> {
        match self {
            ValidationOutcome::Verified(claims) => Ok(claims),
            ValidationOutcome::Rejected(reason) => Err(reason),
        }
    }
}

// ============================================================================
// Codec
// ============================================================================

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
    clock_skew: Duration,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"<redacted>")
            .field("algorithm", &JWT_ALGORITHM)
            .field("lifetime", &self.lifetime)
            .field("clock_skew", &self.clock_skew)
            .finish()
    }
}

impl TokenCodec {
    /// Build a codec around `secret`.
    ///
    /// ## Errors
    ///
    /// - `WeakSecret` if the secret is shorter than [`MIN_SECRET_LENGTH`]
    /// - `InvalidLifetime` if `lifetime` is under one second or over
    ///   [`MAX_LIFETIME_SECONDS`]
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(TokenError::WeakSecret {
                length: secret.len(),
            });
        }
        if lifetime < Duration::seconds(1) || lifetime > Duration::seconds(MAX_LIFETIME_SECONDS) {
            return Err(TokenError::InvalidLifetime);
        }

        // Time checks run against the caller-supplied clock in `decode`, so the
        // library's own wall-clock checks are disabled.
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime,
            clock_skew: Duration::seconds(DEFAULT_CLOCK_SKEW_SECONDS),
        })
    }

    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Result<Self, TokenError> {
        if clock_skew < Duration::zero() || clock_skew > Duration::seconds(MAX_CLOCK_SKEW_SECONDS) {
            return Err(TokenError::InvalidClockSkew);
        }
        self.clock_skew = clock_skew;
        Ok(self)
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Sign a token for `principal`, valid from `now` for the configured lifetime.
    pub fn encode(&self, principal: &Principal, now: DateTime<Utc>) -> Result<String, TokenError> {
        let issued_at = now.timestamp();
        let body = TokenBody {
            id: principal.subject_id,
            email: principal.contact.clone(),
            is_admin: principal.privileged,
            iat: issued_at,
            exp: issued_at + self.lifetime.num_seconds(),
        };

        Ok(encode(&Header::new(JWT_ALGORITHM), &body, &self.encoding_key)?)
    }

    /// Verify `token` and recover its claims as seen at `now`.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> ValidationOutcome {
        let body = match decode::<TokenBody>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(err) => return ValidationOutcome::Rejected(classify(err.kind())),
        };

        let claims = match claims_from_body(body) {
            Some(claims) => claims,
            None => return ValidationOutcome::Rejected(RejectReason::Malformed),
        };

        let now = now.timestamp();
        if now + self.clock_skew.num_seconds() < claims.issued_at.timestamp() {
            return ValidationOutcome::Rejected(RejectReason::NotYetValid);
        }
        if now >= claims.expires_at.timestamp() {
            return ValidationOutcome::Rejected(RejectReason::Expired);
        }

        ValidationOutcome::Verified(claims)
    }
}

fn classify(kind: &ErrorKind) -> RejectReason {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => RejectReason::SignatureInvalid,
        _ => RejectReason::Malformed,
    }
}

fn claims_from_body(body: TokenBody) -> Option<Claims> {
    if body.id <= 0 || !body.email.validate_email() || body.exp <= body.iat {
        return None;
    }
    Some(Claims {
        subject_id: body.id,
        contact: body.email,
        privileged: body.is_admin,
        issued_at: DateTime::from_timestamp(body.iat, 0)?,
        expires_at: DateTime::from_timestamp(body.exp, 0)?,
    })
}

// ============================================================================
// Tests
// ============================================================================

//! Correlation ID conventions shared by the HTTP and gRPC edges.
//!
//! ```text
//! Client HTTP Request
//!   ↓ (X-Correlation-ID header)
//! cart-service auth middleware (extracts or generates the id)
//!   ↓ (correlation-id metadata on ValidateToken)
//! identity-service interceptor (logs it with the validation result)
//! ```

use uuid::Uuid;

/// gRPC metadata key for correlation ID
pub const GRPC_CORRELATION_ID_KEY: &str = "correlation-id";

/// HTTP header for correlation ID
pub const HTTP_CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Longest inbound id we are willing to forward.
const MAX_CORRELATION_ID_LEN: usize = 128;

/// Correlation id attached to a request for the lifetime of one call chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a caller-supplied id if it is printable ASCII of sane length,
    /// otherwise mint a fresh one.
    pub fn from_inbound(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v)
                if !v.is_empty()
                    && v.len() <= MAX_CORRELATION_ID_LEN
                    && v.bytes().all(|b| b.is_ascii_graphic()) =>
            {
                Self(v.to_string())
            }
            _ => Self::generate(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

use std::path::PathBuf;

pub type TlsResult<T> = Result<T, TlsError>;

#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("environment variable {var_name} is not set: {hint}")]
    MissingEnvVar { var_name: String, hint: String },

    #[error("incomplete TLS configuration: {present} is set but {missing} is not")]
    IncompleteConfig { present: String, missing: String },

    #[error("failed to read certificate material from {path:?}: {source}")]
    CertificateReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write certificate material to {path:?}: {source}")]
    CertificateWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse certificate from {path}: {reason}")]
    CertificateParseError { path: String, reason: String },

    #[error("invalid PEM data: {0}")]
    PemParseError(#[from] pem::PemError),

    #[error("certificate expired {days_ago} day(s) ago")]
    CertificateExpired { days_ago: i64 },

    #[error("mTLS client certificate path is missing")]
    MtlsClientCertMissing,

    #[error("mTLS client key path is missing")]
    MtlsClientKeyMissing,

    #[error("certificate SANs [{actual}] do not cover any of [{expected}]")]
    SanValidationError { expected: String, actual: String },

    #[error("certificate generation failed: {0}")]
    GenerationError(#[from] rcgen::Error),
}

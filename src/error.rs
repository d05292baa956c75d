use thiserror::Error;

/// Result type for record and header operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Errors for records
    #[error("malformed record: {reason}")]
    MalformedRecord { reason: String },
    #[error("INFO field {id:?} is not declared in the header")]
    UndeclaredInfoField { id: String },
    #[error("INFO field {id:?} is not set on this record")]
    UnknownInfoField { id: String },
    #[error("FORMAT field {id:?} is not declared in the header")]
    UndeclaredFormatField { id: String },
    #[error("sample {name:?} is not declared in the header")]
    UnknownSample { name: String },
    #[error("unable to construct or retrieve genotype string")]
    SerializationFailure,

    // Errors for the header
    #[error("malformed header line: {line}")]
    MalformedHeader { line: String },
    #[error("{key} field {id:?} is declared more than once")]
    DuplicateHeaderField { key: String, id: String },
}

impl Error {
    pub(crate) fn malformed_record<S: Into<String>>(reason: S) -> Self {
        Error::MalformedRecord {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_header<S: Into<String>>(line: S) -> Self {
        Error::MalformedHeader { line: line.into() }
    }
}

//! Mapping errors.
use displaydoc::Display;
use thiserror::Error;
use tower::BoxError;

pub use crate::configuration::ConfigurationError;
use crate::json_ext::Path;

/// Errors surfaced by the query builder, the decoder and the page walker.
///
/// None of them are retried: they abort the current page or entity and are returned to the
/// immediate caller.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum MappingError {
    /// unknown operation '{0}'
    UnknownOperation(String),

    /// unknown entity shape '{0}'
    UnknownEntity(String),

    /// unknown field '{field}' on '{entity}'
    UnknownField {
        /// The shape the field was looked up on.
        entity: String,
        /// The requested field name.
        field: String,
    },

    /// missing argument '{argument}' for operation '{operation}'
    MissingArgument {
        operation: String,
        argument: String,
    },

    /// operation '{0}' does not return a collection
    NotPaginated(String),

    /// page size {requested} for '{collection}' exceeds the maximum of {maximum}
    PageSizeExceeded {
        /// The connection field the page size applies to.
        collection: String,
        requested: u32,
        maximum: u32,
    },

    /// execution of '{operation}' failed: {source}
    ExecutionFailed {
        operation: String,
        /// The error returned by the execution service, unchanged.
        #[source]
        source: BoxError,
    },

    /// could not decode the response of '{operation}': {source}
    Decode {
        operation: String,
        #[source]
        source: DecodeError,
    },
}

impl MappingError {
    pub(crate) fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        MappingError::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }
}

/// Errors found while mapping a response tree onto typed records.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[ignore_extra_doc_attributes]
#[non_exhaustive]
pub enum DecodeError {
    /// missing required field at '{path}'
    ///
    /// the field was requested but is absent from the response
    MissingRequiredField { path: Path },

    /// invalid value at '{path}': {reason}
    InvalidValue { path: Path, reason: String },

    /// field '{field}' was read but its include flag was not set
    NotRequested { field: String },
}

impl DecodeError {
    pub(crate) fn invalid_value(path: &Path, reason: impl Into<String>) -> Self {
        DecodeError::InvalidValue {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// The path in the response where decoding failed, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            DecodeError::MissingRequiredField { path } | DecodeError::InvalidValue { path, .. } => {
                Some(path)
            }
            DecodeError::NotRequested { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let error = MappingError::PageSizeExceeded {
            collection: "refs".to_string(),
            requested: 500,
            maximum: 100,
        };
        assert_eq!(
            error.to_string(),
            "page size 500 for 'refs' exceeds the maximum of 100"
        );

        let error = MappingError::Decode {
            operation: "RepositoryBranches".to_string(),
            source: DecodeError::MissingRequiredField {
                path: Path::from_keys(["repository", "refs", "totalCount"]),
            },
        };
        assert_eq!(
            error.to_string(),
            "could not decode the response of 'RepositoryBranches': missing required field at 'repository.refs.totalCount'"
        );
    }

    #[test]
    fn execution_failure_keeps_its_source() {
        let error = MappingError::ExecutionFailed {
            operation: "RepositoryBranches".to_string(),
            source: "connection reset".into(),
        };
        let source = std::error::Error::source(&error).expect("source is attached");
        assert_eq!(source.to_string(), "connection reset");
    }
}

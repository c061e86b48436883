//! Execution services.
//!
//! Anything implementing `Service<QuerySpec, Response = Value, Error = BoxError>` can execute
//! queries: the `Value` it returns is the `data` member of the GraphQL response. Failures are
//! passed to the caller unchanged, wrapped in [`crate::MappingError::ExecutionFailed`].

mod http;

pub use http::ExecutionError;
pub use http::HttpExecutor;

//! Maps optional output fields onto GitHub GraphQL queries and decodes the responses.
//!
//! A host names an operation and the fields it wants in a [`QueryRequest`]. The request is
//! resolved against the [`registry::Registry`] into a [`QuerySpec`]: a fixed query document
//! plus variables that switch each optional field on or off. Responses are decoded into the
//! typed records of [`models`], page by page with a [`PageWalker`] for collections.

#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

#[macro_use]
pub mod json_ext;

pub mod configuration;
pub mod decode;
pub mod error;
pub mod flatten;
pub mod graphql;
pub mod models;
pub mod pagination;
pub mod query;
pub mod registry;
pub mod services;

pub use configuration::Configuration;
pub use decode::Decode;
pub use decode::Nullable;
pub use error::DecodeError;
pub use error::MappingError;
pub use pagination::Page;
pub use pagination::PageWalker;
pub use query::QueryRequest;
pub use query::QuerySpec;
pub use services::HttpExecutor;

//! The catalogue: field descriptors, shapes and the records they decode into.

use chrono::DateTime;
use chrono::Utc;

use crate::registry::NodeShape;

pub mod actor;
pub mod branch;
pub mod branch_protection;
pub mod commit;
pub mod connection;
pub mod pull_request;

/// An RFC 3339 timestamp.
pub type Timestamp = DateTime<Utc>;

/// Every shape the registry indexes.
pub static SHAPES: &[NodeShape] = &[
    NodeShape::Union(&actor::ACTOR),
    NodeShape::Entity(&actor::BASIC_USER),
    NodeShape::Entity(&actor::GIT_ACTOR),
    NodeShape::Entity(&commit::BASIC_COMMIT),
    NodeShape::Entity(&commit::COMMIT),
    NodeShape::Entity(&commit::STATUS_SHAPE),
    NodeShape::Union(&commit::SIGNATURE_SHAPE),
    NodeShape::Entity(&branch::BRANCH),
    NodeShape::Union(&branch::GIT_OBJECT),
    NodeShape::Entity(&branch_protection::BASIC_BRANCH_PROTECTION_RULE),
    NodeShape::Entity(&branch_protection::BRANCH_PROTECTION_RULE),
    NodeShape::Entity(&branch_protection::ALLOWANCE),
    NodeShape::Union(&branch_protection::ACTOR_ALLOWANCE),
    NodeShape::Entity(&pull_request::PULL_REQUEST),
    NodeShape::Entity(&pull_request::LABEL),
];

use serde::Serialize;

use crate::decode::Decode;
use crate::decode::DecodeContext;
use crate::error::DecodeError;
use crate::json_ext::Value;
use crate::models::branch_protection::BASIC_BRANCH_PROTECTION_RULE;
use crate::models::branch_protection::BasicBranchProtectionRule;
use crate::models::commit::BASIC_COMMIT_FIELDS;
use crate::models::commit::BasicCommit;
use crate::registry::EntityShape;
use crate::registry::FieldDescriptor;
use crate::registry::UnionShape;
use crate::registry::VariantShape;

pub static NAME: FieldDescriptor = FieldDescriptor::scalar("name", "name");
pub static COMMIT: FieldDescriptor =
    FieldDescriptor::union("commit", "target", &GIT_OBJECT).nullable();
pub static BRANCH_PROTECTION_RULE: FieldDescriptor = FieldDescriptor::object(
    "branch_protection_rule",
    "branchProtectionRule",
    &BASIC_BRANCH_PROTECTION_RULE,
)
.include_if("includeBranchProtectionRule")
.nullable();

pub static BRANCH: EntityShape = EntityShape {
    name: "branch",
    typename: "Ref",
    base: None,
    fields: &[&NAME, &COMMIT, &BRANCH_PROTECTION_RULE],
};

static TAG_NAME: FieldDescriptor = FieldDescriptor::scalar("name", "name");

pub static GIT_OBJECT: UnionShape = UnionShape {
    name: "git_object",
    common: &[],
    variants: &[
        VariantShape {
            typename: "Commit",
            fields: &BASIC_COMMIT_FIELDS,
        },
        VariantShape {
            typename: "Tag",
            fields: &[&TAG_NAME],
        },
    ],
};

/// What a ref points at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum GitObject {
    Commit(BasicCommit),
    Tag { name: String },
    /// Trees, blobs, or anything else a ref can point at.
    Unknown { typename: String },
}

impl GitObject {
    pub fn commit(&self) -> Option<&BasicCommit> {
        match self {
            GitObject::Commit(commit) => Some(commit),
            _ => None,
        }
    }
}

impl Decode for GitObject {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let node = ctx.object(value)?;
        Ok(match ctx.discriminator(node)? {
            "Commit" => GitObject::Commit(BasicCommit::decode(value, ctx)?),
            "Tag" => GitObject::Tag {
                name: ctx.required(node, &TAG_NAME)?,
            },
            other => GitObject::Unknown {
                typename: other.to_string(),
            },
        })
    }
}

/// A branch of a repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub name: String,
    pub commit: Option<GitObject>,
    pub branch_protection_rule: Option<BasicBranchProtectionRule>,
}

impl Branch {
    /// Whether a protection rule matches the branch.
    ///
    /// Only meaningful when `branch_protection_rule` was requested.
    pub fn is_protected(&self) -> bool {
        self.branch_protection_rule.is_some()
    }
}

impl Decode for Branch {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let node = ctx.object(value)?;
        Ok(Self {
            name: ctx.required(node, &NAME)?,
            commit: ctx.required(node, &COMMIT)?,
            branch_protection_rule: ctx.field(node, &BRANCH_PROTECTION_RULE)?,
        })
    }
}

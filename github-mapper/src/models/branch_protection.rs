//! Branch protection rules and the actors allowed to bypass them.

use serde::Serialize;

use crate::decode::Decode;
use crate::decode::DecodeContext;
use crate::error::DecodeError;
use crate::flatten;
use crate::flatten::Explode;
use crate::json_ext::Value;
use crate::models::connection::Connection;
use crate::registry::ConnectionShape;
use crate::registry::EntityShape;
use crate::registry::FieldDescriptor;
use crate::registry::NodeShape;
use crate::registry::UnionShape;
use crate::registry::VariantShape;

pub static NODE_ID: FieldDescriptor = FieldDescriptor::scalar("node_id", "id").alias("nodeId");
pub static PATTERN: FieldDescriptor = FieldDescriptor::scalar("pattern", "pattern");

pub static BASIC_BRANCH_PROTECTION_RULE: EntityShape = EntityShape {
    name: "basic_branch_protection_rule",
    typename: "BranchProtectionRule",
    base: None,
    fields: &[&NODE_ID, &PATTERN],
};

pub static ALLOWS_DELETIONS: FieldDescriptor =
    FieldDescriptor::scalar("allows_deletions", "allowsDeletions")
        .include_if("includeAllowsDeletions");
pub static ALLOWS_FORCE_PUSHES: FieldDescriptor =
    FieldDescriptor::scalar("allows_force_pushes", "allowsForcePushes")
        .include_if("includeAllowsForcePushes");
pub static BLOCKS_CREATIONS: FieldDescriptor =
    FieldDescriptor::scalar("blocks_creations", "blocksCreations")
        .include_if("includeBlocksCreations");
pub static DISMISSES_STALE_REVIEWS: FieldDescriptor =
    FieldDescriptor::scalar("dismisses_stale_reviews", "dismissesStaleReviews")
        .include_if("includeDismissesStaleReviews");
pub static IS_ADMIN_ENFORCED: FieldDescriptor =
    FieldDescriptor::scalar("is_admin_enforced", "isAdminEnforced")
        .include_if("includeIsAdminEnforced");
pub static LOCK_BRANCH: FieldDescriptor =
    FieldDescriptor::scalar("lock_branch", "lockBranch").include_if("includeLockBranch");
pub static REQUIRED_APPROVING_REVIEW_COUNT: FieldDescriptor = FieldDescriptor::scalar(
    "required_approving_review_count",
    "requiredApprovingReviewCount",
)
.include_if("includeRequiredApprovingReviewCount")
.nullable();
pub static REQUIRES_APPROVING_REVIEWS: FieldDescriptor =
    FieldDescriptor::scalar("requires_approving_reviews", "requiresApprovingReviews")
        .include_if("includeRequiresApprovingReviews");
pub static REQUIRES_CODE_OWNER_REVIEWS: FieldDescriptor =
    FieldDescriptor::scalar("requires_code_owner_reviews", "requiresCodeOwnerReviews")
        .include_if("includeRequiresCodeOwnerReviews");
pub static REQUIRES_COMMIT_SIGNATURES: FieldDescriptor =
    FieldDescriptor::scalar("requires_commit_signatures", "requiresCommitSignatures")
        .include_if("includeRequiresCommitSignatures");
pub static REQUIRES_LINEAR_HISTORY: FieldDescriptor =
    FieldDescriptor::scalar("requires_linear_history", "requiresLinearHistory")
        .include_if("includeRequiresLinearHistory");
pub static REQUIRES_STATUS_CHECKS: FieldDescriptor =
    FieldDescriptor::scalar("requires_status_checks", "requiresStatusChecks")
        .include_if("includeRequiresStatusChecks");
pub static PUSH_ALLOWANCES: FieldDescriptor = FieldDescriptor::connection(
    "push_allowances",
    "pushAllowances",
    allowance_connection(NodeShape::Entity(&ALLOWANCE), "pushAllowancesPageSize"),
)
.include_if("includePushAllowances");
pub static BYPASS_FORCE_PUSH_ALLOWANCES: FieldDescriptor = FieldDescriptor::connection(
    "bypass_force_push_allowances",
    "bypassForcePushAllowances",
    allowance_connection(NodeShape::Entity(&ALLOWANCE), "bypassForcePushAllowancesPageSize"),
)
.include_if("includeBypassForcePushAllowances");
pub static BYPASS_PULL_REQUEST_ALLOWANCES: FieldDescriptor = FieldDescriptor::connection(
    "bypass_pull_request_allowances",
    "bypassPullRequestAllowances",
    allowance_connection(NodeShape::Entity(&ALLOWANCE), "bypassPullRequestAllowancesPageSize"),
)
.include_if("includeBypassPullRequestAllowances");

const fn allowance_connection(
    node: NodeShape,
    page_size_variable: &'static str,
) -> ConnectionShape {
    ConnectionShape {
        node,
        page_size_variable,
        default_page_size: 100,
        max_page_size: 100,
    }
}

pub static BRANCH_PROTECTION_RULE: EntityShape = EntityShape {
    name: "branch_protection_rule",
    typename: "BranchProtectionRule",
    base: Some(&BASIC_BRANCH_PROTECTION_RULE),
    fields: &[
        &ALLOWS_DELETIONS,
        &ALLOWS_FORCE_PUSHES,
        &BLOCKS_CREATIONS,
        &DISMISSES_STALE_REVIEWS,
        &IS_ADMIN_ENFORCED,
        &LOCK_BRANCH,
        &REQUIRED_APPROVING_REVIEW_COUNT,
        &REQUIRES_APPROVING_REVIEWS,
        &REQUIRES_CODE_OWNER_REVIEWS,
        &REQUIRES_COMMIT_SIGNATURES,
        &REQUIRES_LINEAR_HISTORY,
        &REQUIRES_STATUS_CHECKS,
        &PUSH_ALLOWANCES,
        &BYPASS_FORCE_PUSH_ALLOWANCES,
        &BYPASS_PULL_REQUEST_ALLOWANCES,
    ],
};

/// A protection rule as embedded in a branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BasicBranchProtectionRule {
    pub node_id: String,
    pub pattern: String,
}

impl Decode for BasicBranchProtectionRule {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let node = ctx.object(value)?;
        Ok(Self {
            node_id: ctx.required(node, &NODE_ID)?,
            pattern: ctx.required(node, &PATTERN)?,
        })
    }
}

/// A protection rule with its settings and allowance lists.
///
/// Each allowance list holds the first page of its connection; its size is set per query with
/// a nested page size.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BranchProtectionRule {
    #[serde(flatten)]
    pub basic: BasicBranchProtectionRule,
    pub allows_deletions: bool,
    pub allows_force_pushes: bool,
    pub blocks_creations: bool,
    pub dismisses_stale_reviews: bool,
    pub is_admin_enforced: bool,
    pub lock_branch: bool,
    pub required_approving_review_count: Option<i64>,
    pub requires_approving_reviews: bool,
    pub requires_code_owner_reviews: bool,
    pub requires_commit_signatures: bool,
    pub requires_linear_history: bool,
    pub requires_status_checks: bool,
    pub push_allowances: Connection<Allowance>,
    pub bypass_force_push_allowances: Connection<Allowance>,
    pub bypass_pull_request_allowances: Connection<Allowance>,
}

impl BranchProtectionRule {
    pub fn push_allowance_buckets(&self) -> AllowanceBuckets {
        flatten::explode(self.push_allowances.nodes.iter().cloned())
    }

    pub fn bypass_force_push_allowance_buckets(&self) -> AllowanceBuckets {
        flatten::explode(self.bypass_force_push_allowances.nodes.iter().cloned())
    }

    pub fn bypass_pull_request_allowance_buckets(&self) -> AllowanceBuckets {
        flatten::explode(self.bypass_pull_request_allowances.nodes.iter().cloned())
    }
}

impl Decode for BranchProtectionRule {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let basic = BasicBranchProtectionRule::decode(value, ctx)?;
        let node = ctx.object(value)?;
        Ok(Self {
            basic,
            allows_deletions: ctx.field(node, &ALLOWS_DELETIONS)?,
            allows_force_pushes: ctx.field(node, &ALLOWS_FORCE_PUSHES)?,
            blocks_creations: ctx.field(node, &BLOCKS_CREATIONS)?,
            dismisses_stale_reviews: ctx.field(node, &DISMISSES_STALE_REVIEWS)?,
            is_admin_enforced: ctx.field(node, &IS_ADMIN_ENFORCED)?,
            lock_branch: ctx.field(node, &LOCK_BRANCH)?,
            required_approving_review_count: ctx.field(node, &REQUIRED_APPROVING_REVIEW_COUNT)?,
            requires_approving_reviews: ctx.field(node, &REQUIRES_APPROVING_REVIEWS)?,
            requires_code_owner_reviews: ctx.field(node, &REQUIRES_CODE_OWNER_REVIEWS)?,
            requires_commit_signatures: ctx.field(node, &REQUIRES_COMMIT_SIGNATURES)?,
            requires_linear_history: ctx.field(node, &REQUIRES_LINEAR_HISTORY)?,
            requires_status_checks: ctx.field(node, &REQUIRES_STATUS_CHECKS)?,
            push_allowances: ctx.field(node, &PUSH_ALLOWANCES)?,
            bypass_force_push_allowances: ctx.field(node, &BYPASS_FORCE_PUSH_ALLOWANCES)?,
            bypass_pull_request_allowances: ctx.field(node, &BYPASS_PULL_REQUEST_ALLOWANCES)?,
        })
    }
}

static ALLOWANCE_NAME: FieldDescriptor = FieldDescriptor::scalar("name", "name");
static ALLOWANCE_SLUG: FieldDescriptor = FieldDescriptor::scalar("slug", "slug");
static ALLOWANCE_LOGIN: FieldDescriptor = FieldDescriptor::scalar("login", "login");
// User.name is nullable where App.name and Team.name are not; a shared response key would not
// validate.
static ALLOWANCE_USER_NAME: FieldDescriptor = FieldDescriptor::scalar("name", "name")
    .alias("userName")
    .nullable();

pub static ACTOR_ALLOWANCE: UnionShape = UnionShape {
    name: "actor_allowance",
    common: &[],
    variants: &[
        VariantShape {
            typename: "App",
            fields: &[&ALLOWANCE_NAME, &ALLOWANCE_SLUG],
        },
        VariantShape {
            typename: "Team",
            fields: &[&ALLOWANCE_NAME, &ALLOWANCE_SLUG],
        },
        VariantShape {
            typename: "User",
            fields: &[&ALLOWANCE_USER_NAME, &ALLOWANCE_LOGIN],
        },
    ],
};

pub static ACTOR: FieldDescriptor =
    FieldDescriptor::union("actor", "actor", &ACTOR_ALLOWANCE).nullable();

pub static ALLOWANCE: EntityShape = EntityShape {
    name: "allowance",
    typename: "BypassForcePushAllowance",
    base: None,
    fields: &[&ACTOR],
};

/// An app or team.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NameSlug {
    pub name: String,
    pub slug: String,
}

/// A user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NameLogin {
    pub name: Option<String>,
    pub login: String,
}

/// The actor an allowance grants something to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ActorAllowance {
    App(NameSlug),
    Team(NameSlug),
    User(NameLogin),
    /// An actor type without a bucket; dropped when flattened.
    Unknown { typename: String },
}

impl Decode for ActorAllowance {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let node = ctx.object(value)?;
        Ok(match ctx.discriminator(node)? {
            "App" => ActorAllowance::App(NameSlug {
                name: ctx.required(node, &ALLOWANCE_NAME)?,
                slug: ctx.required(node, &ALLOWANCE_SLUG)?,
            }),
            "Team" => ActorAllowance::Team(NameSlug {
                name: ctx.required(node, &ALLOWANCE_NAME)?,
                slug: ctx.required(node, &ALLOWANCE_SLUG)?,
            }),
            "User" => ActorAllowance::User(NameLogin {
                name: ctx.required(node, &ALLOWANCE_USER_NAME)?,
                login: ctx.required(node, &ALLOWANCE_LOGIN)?,
            }),
            other => ActorAllowance::Unknown {
                typename: other.to_string(),
            },
        })
    }
}

/// One entry of an allowance list. The actor is `null` when it has been deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Allowance {
    pub actor: Option<ActorAllowance>,
}

impl Decode for Allowance {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let node = ctx.object(value)?;
        Ok(Self {
            actor: ctx.required(node, &ACTOR)?,
        })
    }
}

/// An allowance list split by actor type. Each bucket keeps the order of the source list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AllowanceBuckets {
    pub apps: Vec<NameSlug>,
    pub teams: Vec<NameSlug>,
    pub users: Vec<NameLogin>,
}

impl AllowanceBuckets {
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty() && self.teams.is_empty() && self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.apps.len() + self.teams.len() + self.users.len()
    }
}

impl Explode for ActorAllowance {
    type Buckets = AllowanceBuckets;

    fn explode_into(self, buckets: &mut AllowanceBuckets) -> bool {
        match self {
            ActorAllowance::App(app) => buckets.apps.push(app),
            ActorAllowance::Team(team) => buckets.teams.push(team),
            ActorAllowance::User(user) => buckets.users.push(user),
            ActorAllowance::Unknown { typename } => {
                tracing::debug!(%typename, "no bucket for allowance actor");
                return false;
            }
        }
        true
    }
}

impl Explode for Allowance {
    type Buckets = AllowanceBuckets;

    fn explode_into(self, buckets: &mut AllowanceBuckets) -> bool {
        self.actor.explode_into(buckets)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json_bytes::json;

    use super::*;
    use crate::json_ext::Object;

    fn team(slug: &str) -> NameSlug {
        NameSlug {
            name: slug.to_uppercase(),
            slug: slug.to_string(),
        }
    }

    #[test]
    fn rule_with_allowances() {
        let value = json!({
            "nodeId": "BPR_1",
            "pattern": "main",
            "requiredApprovingReviewCount": 2,
            "pushAllowances": {
                "totalCount": 3,
                "pageInfo": {"endCursor": "Mw", "hasNextPage": false},
                "nodes": [
                    {"actor": {"__typename": "Team", "name": "CORE", "slug": "core"}},
                    {"actor": null},
                    {"actor": {"__typename": "App", "name": "Bot", "slug": "bot"}}
                ]
            }
        });
        let variables = json!({
            "includeRequiredApprovingReviewCount": true,
            "includePushAllowances": true,
            "pushAllowancesPageSize": 100
        });
        let variables = variables.as_object().unwrap();
        let rule =
            BranchProtectionRule::decode(&value, &mut DecodeContext::new(variables)).unwrap();
        assert_eq!(rule.basic.pattern, "main");
        assert_eq!(rule.required_approving_review_count, Some(2));
        assert!(!rule.allows_deletions);
        assert_eq!(rule.push_allowances.total_count, 3);
        assert_eq!(rule.bypass_force_push_allowances, Connection::default());

        let buckets = rule.push_allowance_buckets();
        assert_eq!(buckets.teams, [team("core")]);
        assert_eq!(buckets.apps.len(), 1);
        assert!(buckets.users.is_empty());
        assert_eq!(buckets.len(), 2);
    }

    #[test]
    fn unknown_actor_type_decodes_to_unknown() {
        let variables = Object::new();
        let actor = ActorAllowance::decode(
            &json!({"__typename": "EnterpriseTeam", "name": "x"}),
            &mut DecodeContext::new(&variables),
        )
        .unwrap();
        assert_eq!(
            actor,
            ActorAllowance::Unknown {
                typename: "EnterpriseTeam".to_string()
            }
        );
    }
}

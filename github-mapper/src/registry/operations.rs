use super::ArgumentDescriptor;
use super::ConnectionShape;
use super::NodeShape;
use super::OperationDescriptor;
use super::OperationTarget;
use super::PathSegment;
use crate::models::branch::BRANCH;
use crate::models::branch_protection::BRANCH_PROTECTION_RULE;
use crate::models::commit::COMMIT;
use crate::models::pull_request::PULL_REQUEST;

/// Variable holding the page size of an operation's root connection.
pub const PAGE_SIZE_VARIABLE: &str = "pageSize";
/// Variable holding the cursor of an operation's root connection.
pub const CURSOR_VARIABLE: &str = "cursor";

const OWNER_AND_REPO: &[ArgumentDescriptor] = &[
    ArgumentDescriptor {
        name: "owner",
        ty: "String!",
    },
    ArgumentDescriptor {
        name: "repo",
        ty: "String!",
    },
];

const REPOSITORY: PathSegment = PathSegment::Field {
    name: "repository",
    arguments: &[("owner", "$owner"), ("name", "$repo")],
};

const fn root_connection(node: NodeShape, default_page_size: u32) -> ConnectionShape {
    ConnectionShape {
        node,
        page_size_variable: PAGE_SIZE_VARIABLE,
        default_page_size,
        max_page_size: 100,
    }
}

pub static REPOSITORY_BRANCHES: OperationDescriptor = OperationDescriptor {
    name: "repository_branches",
    operation_name: "RepositoryBranches",
    arguments: OWNER_AND_REPO,
    path: &[
        REPOSITORY,
        PathSegment::Field {
            name: "refs",
            arguments: &[("refPrefix", "\"refs/heads/\"")],
        },
    ],
    target: OperationTarget::Collection(root_connection(NodeShape::Entity(&BRANCH), 100)),
};

pub static REPOSITORY_COMMITS: OperationDescriptor = OperationDescriptor {
    name: "repository_commits",
    operation_name: "RepositoryCommits",
    arguments: OWNER_AND_REPO,
    path: &[
        REPOSITORY,
        PathSegment::Field {
            name: "defaultBranchRef",
            arguments: &[],
        },
        PathSegment::Field {
            name: "target",
            arguments: &[],
        },
        PathSegment::On("Commit"),
        PathSegment::Field {
            name: "history",
            arguments: &[],
        },
    ],
    target: OperationTarget::Collection(root_connection(NodeShape::Entity(&COMMIT), 50)),
};

pub static REPOSITORY_COMMIT: OperationDescriptor = OperationDescriptor {
    name: "repository_commit",
    operation_name: "RepositoryCommit",
    arguments: &[
        ArgumentDescriptor {
            name: "owner",
            ty: "String!",
        },
        ArgumentDescriptor {
            name: "repo",
            ty: "String!",
        },
        ArgumentDescriptor {
            name: "sha",
            ty: "GitObjectID!",
        },
    ],
    path: &[
        REPOSITORY,
        PathSegment::Field {
            name: "object",
            arguments: &[("oid", "$sha")],
        },
        PathSegment::On("Commit"),
    ],
    target: OperationTarget::Entity(&COMMIT),
};

pub static REPOSITORY_PULL_REQUESTS: OperationDescriptor = OperationDescriptor {
    name: "repository_pull_requests",
    operation_name: "RepositoryPullRequests",
    arguments: OWNER_AND_REPO,
    path: &[
        REPOSITORY,
        PathSegment::Field {
            name: "pullRequests",
            arguments: &[("orderBy", "{field: CREATED_AT, direction: DESC}")],
        },
    ],
    target: OperationTarget::Collection(root_connection(
        NodeShape::Entity(&PULL_REQUEST),
        50,
    )),
};

pub static REPOSITORY_PULL_REQUEST: OperationDescriptor = OperationDescriptor {
    name: "repository_pull_request",
    operation_name: "RepositoryPullRequest",
    arguments: &[
        ArgumentDescriptor {
            name: "owner",
            ty: "String!",
        },
        ArgumentDescriptor {
            name: "repo",
            ty: "String!",
        },
        ArgumentDescriptor {
            name: "number",
            ty: "Int!",
        },
    ],
    path: &[
        REPOSITORY,
        PathSegment::Field {
            name: "pullRequest",
            arguments: &[("number", "$number")],
        },
    ],
    target: OperationTarget::Entity(&PULL_REQUEST),
};

pub static REPOSITORY_BRANCH_PROTECTION_RULES: OperationDescriptor = OperationDescriptor {
    name: "repository_branch_protection_rules",
    operation_name: "RepositoryBranchProtectionRules",
    arguments: OWNER_AND_REPO,
    path: &[
        REPOSITORY,
        PathSegment::Field {
            name: "branchProtectionRules",
            arguments: &[],
        },
    ],
    target: OperationTarget::Collection(root_connection(
        NodeShape::Entity(&BRANCH_PROTECTION_RULE),
        30,
    )),
};

/// Every operation the mapper can build.
pub static OPERATIONS: &[&OperationDescriptor] = &[
    &REPOSITORY_BRANCHES,
    &REPOSITORY_COMMITS,
    &REPOSITORY_COMMIT,
    &REPOSITORY_PULL_REQUESTS,
    &REPOSITORY_PULL_REQUEST,
    &REPOSITORY_BRANCH_PROTECTION_RULES,
];

use serde::Serialize;

use crate::decode::Decode;
use crate::decode::DecodeContext;
use crate::decode::Nullable;
use crate::error::DecodeError;
use crate::json_ext::Value;
use crate::models::Timestamp;
use crate::models::actor::ACTOR;
use crate::models::actor::Actor;
use crate::models::connection::Connection;
use crate::registry::ConnectionShape;
use crate::registry::EntityShape;
use crate::registry::FieldDescriptor;
use crate::registry::NodeShape;

pub static NUMBER: FieldDescriptor = FieldDescriptor::scalar("number", "number");
pub static NODE_ID: FieldDescriptor = FieldDescriptor::scalar("node_id", "id").alias("nodeId");
pub static TITLE: FieldDescriptor = FieldDescriptor::scalar("title", "title");
pub static STATE: FieldDescriptor = FieldDescriptor::scalar("state", "state");
pub static URL: FieldDescriptor = FieldDescriptor::scalar("url", "url");
pub static CREATED_AT: FieldDescriptor = FieldDescriptor::scalar("created_at", "createdAt");
pub static AUTHOR: FieldDescriptor = FieldDescriptor::union("author", "author", &ACTOR)
    .include_if("includePRAuthor")
    .nullable();
pub static UPDATED_AT: FieldDescriptor =
    FieldDescriptor::scalar("updated_at", "updatedAt").include_if("includePRUpdatedAt");
pub static CLOSED_AT: FieldDescriptor = FieldDescriptor::scalar("closed_at", "closedAt")
    .include_if("includePRClosedAt")
    .nullable();
pub static MERGED_AT: FieldDescriptor = FieldDescriptor::scalar("merged_at", "mergedAt")
    .include_if("includePRMergedAt")
    .nullable();
pub static MERGED_BY: FieldDescriptor = FieldDescriptor::union("merged_by", "mergedBy", &ACTOR)
    .include_if("includePRMergedBy")
    .nullable();
pub static IS_DRAFT: FieldDescriptor =
    FieldDescriptor::scalar("is_draft", "isDraft").include_if("includePRIsDraft");
pub static ADDITIONS: FieldDescriptor =
    FieldDescriptor::scalar("additions", "additions").include_if("includePRAdditions");
pub static DELETIONS: FieldDescriptor =
    FieldDescriptor::scalar("deletions", "deletions").include_if("includePRDeletions");
pub static CHANGED_FILES: FieldDescriptor =
    FieldDescriptor::scalar("changed_files", "changedFiles").include_if("includePRChangedFiles");
pub static HEAD_REF_NAME: FieldDescriptor =
    FieldDescriptor::scalar("head_ref_name", "headRefName").include_if("includePRHeadRefName");
pub static BASE_REF_NAME: FieldDescriptor =
    FieldDescriptor::scalar("base_ref_name", "baseRefName").include_if("includePRBaseRefName");
pub static MERGEABLE: FieldDescriptor =
    FieldDescriptor::scalar("mergeable", "mergeable").include_if("includePRMergeable");
pub static LABELS: FieldDescriptor = FieldDescriptor::connection(
    "labels",
    "labels",
    ConnectionShape {
        node: NodeShape::Entity(&LABEL),
        page_size_variable: "labelsPageSize",
        default_page_size: 10,
        max_page_size: 100,
    },
)
.include_if("includePRLabels");

pub static PULL_REQUEST: EntityShape = EntityShape {
    name: "pull_request",
    typename: "PullRequest",
    base: None,
    fields: &[
        &NUMBER,
        &NODE_ID,
        &TITLE,
        &STATE,
        &URL,
        &CREATED_AT,
        &AUTHOR,
        &UPDATED_AT,
        &CLOSED_AT,
        &MERGED_AT,
        &MERGED_BY,
        &IS_DRAFT,
        &ADDITIONS,
        &DELETIONS,
        &CHANGED_FILES,
        &HEAD_REF_NAME,
        &BASE_REF_NAME,
        &MERGEABLE,
        &LABELS,
    ],
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PullRequest {
    pub number: i64,
    pub node_id: String,
    pub title: String,
    /// `OPEN`, `CLOSED` or `MERGED`.
    pub state: String,
    pub url: String,
    pub created_at: Timestamp,
    pub author: Option<Actor>,
    pub updated_at: Nullable<Timestamp>,
    pub closed_at: Nullable<Timestamp>,
    pub merged_at: Nullable<Timestamp>,
    pub merged_by: Option<Actor>,
    pub is_draft: bool,
    pub additions: i64,
    pub deletions: i64,
    pub changed_files: i64,
    pub head_ref_name: String,
    pub base_ref_name: String,
    pub mergeable: String,
    pub labels: Connection<Label>,
}

impl Decode for PullRequest {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let node = ctx.object(value)?;
        Ok(Self {
            number: ctx.required(node, &NUMBER)?,
            node_id: ctx.required(node, &NODE_ID)?,
            title: ctx.required(node, &TITLE)?,
            state: ctx.required(node, &STATE)?,
            url: ctx.required(node, &URL)?,
            created_at: ctx.required(node, &CREATED_AT)?,
            author: ctx.field(node, &AUTHOR)?,
            updated_at: ctx.field(node, &UPDATED_AT)?,
            closed_at: ctx.field(node, &CLOSED_AT)?,
            merged_at: ctx.field(node, &MERGED_AT)?,
            merged_by: ctx.field(node, &MERGED_BY)?,
            is_draft: ctx.field(node, &IS_DRAFT)?,
            additions: ctx.field(node, &ADDITIONS)?,
            deletions: ctx.field(node, &DELETIONS)?,
            changed_files: ctx.field(node, &CHANGED_FILES)?,
            head_ref_name: ctx.field(node, &HEAD_REF_NAME)?,
            base_ref_name: ctx.field(node, &BASE_REF_NAME)?,
            mergeable: ctx.field(node, &MERGEABLE)?,
            labels: ctx.field(node, &LABELS)?,
        })
    }
}

static LABEL_NAME: FieldDescriptor = FieldDescriptor::scalar("name", "name");
static LABEL_COLOR: FieldDescriptor = FieldDescriptor::scalar("color", "color");
static LABEL_DESCRIPTION: FieldDescriptor =
    FieldDescriptor::scalar("description", "description").nullable();

pub static LABEL: EntityShape = EntityShape {
    name: "label",
    typename: "Label",
    base: None,
    fields: &[&LABEL_NAME, &LABEL_COLOR, &LABEL_DESCRIPTION],
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Label {
    pub name: String,
    /// Hex color without the leading `#`.
    pub color: String,
    pub description: Option<String>,
}

impl Decode for Label {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let node = ctx.object(value)?;
        Ok(Self {
            name: ctx.required(node, &LABEL_NAME)?,
            color: ctx.required(node, &LABEL_COLOR)?,
            description: ctx.required(node, &LABEL_DESCRIPTION)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn merged_pull_request_with_labels() {
        let value = json!({
            "number": 42,
            "nodeId": "PR_kwDOA",
            "title": "Add pagination",
            "state": "MERGED",
            "url": "https://github.com/octo/repo/pull/42",
            "createdAt": "2024-02-01T10:00:00Z",
            "mergedAt": "2024-02-03T16:20:00Z",
            "mergedBy": null,
            "labels": {
                "totalCount": 1,
                "pageInfo": {"endCursor": "MQ", "hasNextPage": false},
                "nodes": [{"name": "enhancement", "color": "a2eeef", "description": null}]
            }
        });
        let variables = json!({
            "includePRMergedAt": true,
            "includePRMergedBy": true,
            "includePRLabels": true,
            "includePRClosedAt": false
        });
        let variables = variables.as_object().unwrap();
        let pull_request =
            PullRequest::decode(&value, &mut DecodeContext::new(variables)).unwrap();
        assert_eq!(pull_request.number, 42);
        assert!(!pull_request.merged_at.is_null());
        assert!(pull_request.closed_at.is_null());
        assert_eq!(pull_request.merged_by, None);
        assert_eq!(pull_request.labels.nodes[0].name, "enhancement");
        assert_eq!(pull_request.author, None);
    }
}

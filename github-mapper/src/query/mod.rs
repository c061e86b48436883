//! Building query specs from host requests.

use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;

use crate::decode;
use crate::decode::Decode;
use crate::error::DecodeError;
use crate::error::MappingError;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::pagination::Page;
use crate::registry::CURSOR_VARIABLE;
use crate::registry::FieldDescriptor;
use crate::registry::FieldKind;
use crate::registry::OperationDescriptor;
use crate::registry::OperationTarget;
use crate::registry::Registry;

pub(crate) mod render;

/// What a host asks for: an operation, the optional fields it wants, and how to page.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryRequest {
    operation: String,
    fields: Vec<String>,
    arguments: HashMap<String, Value>,
    page_size: Option<u32>,
    cursor: Option<String>,
    nested_page_sizes: HashMap<String, u32>,
}

#[buildstructor::buildstructor]
impl QueryRequest {
    /// Returns a builder that builds a [`QueryRequest`].
    ///
    /// Unset page sizes fall back to the default of their connection.
    #[builder(visibility = "pub")]
    fn new(
        operation: String,
        fields: Vec<String>,
        arguments: HashMap<String, Value>,
        page_size: Option<u32>,
        cursor: Option<String>,
        nested_page_sizes: HashMap<String, u32>,
    ) -> Self {
        Self {
            operation,
            fields,
            arguments,
            page_size,
            cursor,
            nested_page_sizes,
        }
    }
}

impl QueryRequest {
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// The same request, resumed at `cursor`. `None` starts from the first page.
    pub fn with_cursor(&self, cursor: Option<String>) -> Self {
        Self {
            cursor,
            ..self.clone()
        }
    }

    /// Resolve the request against the registry.
    ///
    /// Requested fields are deduplicated and put in declaration order, so two requests for the
    /// same set of fields produce identical specs.
    #[tracing::instrument(skip_all, fields(operation = %self.operation), level = "debug")]
    pub fn build_query(&self) -> Result<QuerySpec, MappingError> {
        let registry = Registry::global();
        let prepared = registry.operation(&self.operation)?;
        let operation = prepared.descriptor;
        let index = registry.entity(operation.node().name())?;

        let mut selected_fields = self
            .fields
            .iter()
            .map(|name| index.lookup(name))
            .collect::<Result<Vec<_>, _>>()?;
        selected_fields.sort_by_key(|field| index.position(field.name));
        selected_fields.dedup_by_key(|field| field.name);

        let mut variables = Object::new();
        for argument in operation.arguments {
            match self.arguments.get(argument.name) {
                Some(value) => {
                    variables.insert(argument.name, value.clone());
                }
                None if argument.is_required() => {
                    return Err(MappingError::MissingArgument {
                        operation: operation.name.to_string(),
                        argument: argument.name.to_string(),
                    });
                }
                None => {}
            }
        }
        for name in self.arguments.keys().sorted() {
            if !operation.arguments.iter().any(|argument| argument.name == name.as_str()) {
                tracing::warn!(
                    argument = %name,
                    "ignoring an argument the operation does not declare"
                );
            }
        }

        match &operation.target {
            OperationTarget::Collection(connection) => {
                let collection = operation.response_path().last().unwrap_or(operation.name);
                let page_size = connection.page_size(collection, self.page_size)?;
                variables.insert(connection.page_size_variable, page_size.into());
                if let Some(cursor) = &self.cursor {
                    variables.insert(CURSOR_VARIABLE, cursor.as_str().into());
                }
            }
            OperationTarget::Entity(_) => {
                if self.page_size.is_some() || self.cursor.is_some() {
                    tracing::debug!("ignoring paging options of an entity operation");
                }
            }
        }

        for name in self.nested_page_sizes.keys().sorted() {
            if prepared.connection(name).is_none() {
                return Err(MappingError::unknown_field(operation.node().name(), name.as_str()));
            }
        }
        for field in &prepared.connections {
            if let FieldKind::Connection(connection) = field.kind {
                let requested = self.nested_page_sizes.get(field.name).copied();
                let page_size = connection.page_size(field.name, requested)?;
                variables.insert(connection.page_size_variable, page_size.into());
            }
        }

        for flag in &prepared.flags {
            variables.insert(*flag, false.into());
        }
        for field in &selected_fields {
            if let Some(flag) = field.include_flag {
                variables.insert(flag, true.into());
            }
        }

        tracing::debug!(
            fields = selected_fields.len(),
            variables = variables.len(),
            "built query"
        );
        Ok(QuerySpec {
            operation,
            document: prepared.document.as_str(),
            selected_fields,
            variables,
        })
    }
}

/// A ready-to-send query: a document and its variables.
#[derive(Clone, Debug, PartialEq)]
pub struct QuerySpec {
    operation: &'static OperationDescriptor,
    document: &'static str,
    selected_fields: Vec<&'static FieldDescriptor>,
    variables: Object,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody<'a> {
    query: &'a str,
    operation_name: &'a str,
    variables: &'a Object,
}

impl QuerySpec {
    pub fn operation(&self) -> &'static OperationDescriptor {
        self.operation
    }

    pub fn document(&self) -> &'static str {
        self.document
    }

    /// The requested fields, in declaration order.
    pub fn selected_fields(&self) -> &[&'static FieldDescriptor] {
        &self.selected_fields
    }

    pub fn variables(&self) -> &Object {
        &self.variables
    }

    /// The cursor this spec fetches from, `None` for the first page.
    pub fn cursor(&self) -> Option<&str> {
        self.variables.get(CURSOR_VARIABLE).and_then(Value::as_str)
    }

    /// The JSON body of a GraphQL POST request.
    pub fn to_request_body(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&RequestBody {
            query: self.document,
            operation_name: self.operation.operation_name,
            variables: &self.variables,
        })
    }

    /// Decode the `data` of a collection operation's response into one page.
    ///
    /// A `null` along the path to the connection yields an empty, final page.
    pub fn decode_page<T: Decode>(&self, data: &Value) -> Result<Page<T>, DecodeError> {
        decode::page(self, data)
    }

    /// Decode the `data` of an entity operation's response.
    pub fn decode_entity<T: Decode>(&self, data: &Value) -> Result<Option<T>, DecodeError> {
        decode::entity(self, data)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json_bytes::json;

    use super::*;
    use crate::json_ext::Path;
    use crate::models::branch_protection::BranchProtectionRule;
    use crate::models::commit::Commit;

    fn commit_request(fields: &[&str]) -> QueryRequest {
        QueryRequest::builder()
            .operation("repository_commit")
            .argument("owner", "octo")
            .argument("repo", "hello-world")
            .argument("sha", "9a1b2c3")
            .fields(fields.iter().map(|field| field.to_string()).collect::<Vec<_>>())
            .build()
    }

    #[test]
    fn gated_fields_flip_their_flag() {
        let spec = commit_request(&["additions", "signature"]).build_query().unwrap();
        let variables = spec.variables();
        assert_eq!(variables.get("owner"), Some(&json!("octo")));
        assert_eq!(variables.get("includeCommitAdditions"), Some(&json!(true)));
        assert_eq!(variables.get("includeCommitSignature"), Some(&json!(true)));
        assert_eq!(variables.get("includeCommitDeletions"), Some(&json!(false)));
        assert_eq!(variables.get("pageSize"), None);
        assert_eq!(spec.cursor(), None);
    }

    #[test]
    fn field_order_does_not_matter() {
        let one = commit_request(&["signature", "additions", "sha"])
            .build_query()
            .unwrap();
        let other = commit_request(&["sha", "additions", "signature", "additions"])
            .build_query()
            .unwrap();
        assert_eq!(
            one.to_request_body().unwrap(),
            other.to_request_body().unwrap()
        );
        let names: Vec<_> = one.selected_fields().iter().map(|field| field.name).collect();
        assert_eq!(names, ["sha", "additions", "signature"]);
    }

    #[test]
    fn no_fields_selects_only_the_ungated_ones() {
        let spec = commit_request(&[]).build_query().unwrap();
        assert!(spec.selected_fields().is_empty());
        assert!(
            spec.variables()
                .iter()
                .filter(|(key, _)| key.as_str().starts_with("include"))
                .all(|(_, value)| value == &json!(false))
        );
    }

    #[test]
    fn unknown_field_fails_the_whole_request() {
        let error = commit_request(&["additions", "stargazers"])
            .build_query()
            .unwrap_err();
        assert!(matches!(
            error,
            MappingError::UnknownField { ref entity, ref field }
                if entity == "commit" && field == "stargazers"
        ));
    }

    #[test]
    fn unknown_operation() {
        let error = QueryRequest::builder()
            .operation("repository_stargazers")
            .build()
            .build_query()
            .unwrap_err();
        assert_eq!(error.to_string(), "unknown operation 'repository_stargazers'");
    }

    #[test]
    fn missing_argument() {
        let error = QueryRequest::builder()
            .operation("repository_commit")
            .argument("owner", "octo")
            .argument("repo", "hello-world")
            .build()
            .build_query()
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "missing argument 'sha' for operation 'repository_commit'"
        );
    }

    #[test]
    fn page_sizes() {
        let request = QueryRequest::builder()
            .operation("repository_branch_protection_rules")
            .argument("owner", "octo")
            .argument("repo", "hello-world")
            .page_size(10)
            .nested_page_size("push_allowances", 25)
            .cursor("Y3Vyc29yOjEw")
            .build();
        let spec = request.build_query().unwrap();
        let variables = spec.variables();
        assert_eq!(variables.get("pageSize"), Some(&json!(10)));
        assert_eq!(variables.get("pushAllowancesPageSize"), Some(&json!(25)));
        assert_eq!(
            variables.get("bypassForcePushAllowancesPageSize"),
            Some(&json!(100))
        );
        assert_eq!(spec.cursor(), Some("Y3Vyc29yOjEw"));

        let first_page = request.with_cursor(None).build_query().unwrap();
        assert_eq!(first_page.cursor(), None);
        assert_eq!(first_page.document(), spec.document());
    }

    #[test]
    fn page_size_above_the_maximum() {
        let error = QueryRequest::builder()
            .operation("repository_branches")
            .argument("owner", "octo")
            .argument("repo", "hello-world")
            .page_size(101)
            .build()
            .build_query()
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "page size 101 for 'refs' exceeds the maximum of 100"
        );

        let error = QueryRequest::builder()
            .operation("repository_pull_requests")
            .argument("owner", "octo")
            .argument("repo", "hello-world")
            .nested_page_size("labels", 500)
            .build()
            .build_query()
            .unwrap_err();
        assert!(matches!(
            error,
            MappingError::PageSizeExceeded { ref collection, requested: 500, maximum: 100 }
                if collection == "labels"
        ));
    }

    #[test]
    fn nested_page_size_for_an_unknown_connection() {
        let error = QueryRequest::builder()
            .operation("repository_pull_requests")
            .argument("owner", "octo")
            .argument("repo", "hello-world")
            .nested_page_size("reviewers", 5)
            .build()
            .build_query()
            .unwrap_err();
        assert_eq!(error.to_string(), "unknown field 'reviewers' on 'pull_request'");
    }

    #[test]
    fn request_body() {
        let spec = commit_request(&["additions"]).build_query().unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(&spec.to_request_body().unwrap()).unwrap();
        assert_eq!(body["operationName"], "RepositoryCommit");
        assert_eq!(body["query"], spec.document());
        assert_eq!(body["variables"]["sha"], "9a1b2c3");
        assert_eq!(body["variables"]["includeCommitAdditions"], true);
    }

    #[test]
    fn decode_entity_through_the_operation_path() {
        let spec = commit_request(&["additions"]).build_query().unwrap();
        let data = json!({
            "repository": {
                "object": {
                    "__typename": "Commit",
                    "sha": "9a1b2c3d",
                    "shortSha": "9a1b2c3",
                    "authoredDate": "2024-01-15T09:00:00Z",
                    "author": null,
                    "committer": null,
                    "message": "init",
                    "url": "https://github.com/octo/hello-world/commit/9a1b2c3d",
                    "additions": 3
                }
            }
        });
        let commit: Commit = spec.decode_entity(&data).unwrap().unwrap();
        assert_eq!(commit.additions, 3);
        assert_eq!(commit.deletions, 0);

        let missing = json!({"repository": {"object": null}});
        assert_eq!(spec.decode_entity::<Commit>(&missing).unwrap(), None);
    }

    #[test]
    fn commit_lookup_resolving_to_another_object_type() {
        let spec = commit_request(&[]).build_query().unwrap();
        let tree = json!({"repository": {"object": {"__typename": "Tree"}}});
        assert_eq!(spec.decode_entity::<Commit>(&tree).unwrap(), None);

        let untyped = json!({"repository": {"object": {}}});
        assert_eq!(
            spec.decode_entity::<Commit>(&untyped).unwrap_err(),
            DecodeError::MissingRequiredField {
                path: Path::from_keys(["repository", "object", "__typename"])
            }
        );
    }

    #[test]
    fn default_branch_pointing_at_a_tag_has_no_history() {
        let spec = QueryRequest::builder()
            .operation("repository_commits")
            .argument("owner", "octo")
            .argument("repo", "hello-world")
            .build()
            .build_query()
            .unwrap();
        let tag = json!({"repository": {"defaultBranchRef": {"target": {"__typename": "Tag"}}}});
        assert_eq!(spec.decode_page::<Commit>(&tag).unwrap(), Page::default());
        let empty = json!({"repository": {"defaultBranchRef": null}});
        assert_eq!(spec.decode_page::<Commit>(&empty).unwrap(), Page::default());
    }

    #[test]
    fn decoding_twice_yields_equal_records() {
        let spec = QueryRequest::builder()
            .operation("repository_branch_protection_rules")
            .argument("owner", "octo")
            .argument("repo", "hello-world")
            .field("push_allowances")
            .field("required_approving_review_count")
            .build()
            .build_query()
            .unwrap();
        let allowances = json!([
            {"actor": {"__typename": "App", "name": "Deployer", "slug": "deployer"}},
            {"actor": {"__typename": "EnterpriseTeam"}},
            {"actor": null}
        ]);
        let data = json!({
            "repository": {
                "branchProtectionRules": {
                    "totalCount": 1,
                    "pageInfo": {"endCursor": "MQ", "hasNextPage": false},
                    "nodes": [{
                        "nodeId": "BPR_kwDOA",
                        "pattern": "main",
                        "requiredApprovingReviewCount": null,
                        "pushAllowances": {
                            "totalCount": 3,
                            "pageInfo": {"endCursor": "Mw", "hasNextPage": false},
                            "nodes": allowances
                        }
                    }]
                }
            }
        });

        let first = spec.decode_page::<BranchProtectionRule>(&data).unwrap();
        let second = spec.decode_page::<BranchProtectionRule>(&data).unwrap();
        assert_eq!(first, second);
        let rule = &first.items[0];
        assert_eq!(rule.push_allowances.nodes.len(), 3);
        assert_eq!(rule.required_approving_review_count, None);
        assert_eq!(rule.push_allowance_buckets().apps.len(), 1);
    }
}

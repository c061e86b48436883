//! GraphQL response envelope.

use serde::Deserialize;
use serde::Serialize;

use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;

/// A GraphQL response as returned by the API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Error>,
}

/// A GraphQL error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    /// The error message.
    pub message: String,

    /// The path of the field the error is attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Path>,

    /// The error classification, e.g. `NOT_FOUND` or `RATE_LIMITED`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,

    #[serde(default, skip_serializing_if = "Object::is_empty")]
    pub extensions: Object,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} (at '{path}')", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_response_with_errors() {
        let response: Response = serde_json::from_str(
            r#"{
                "data": {"repository": null},
                "errors": [{
                    "type": "NOT_FOUND",
                    "path": ["repository"],
                    "locations": [{"line": 2, "column": 3}],
                    "message": "Could not resolve to a Repository with the name 'octo/missing'."
                }]
            }"#,
        )
        .unwrap();
        assert!(response.data.is_some());
        let error = &response.errors[0];
        assert_eq!(error.error_type.as_deref(), Some("NOT_FOUND"));
        assert_eq!(
            error.to_string(),
            "Could not resolve to a Repository with the name 'octo/missing'. (at 'repository')"
        );
    }
}

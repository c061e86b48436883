//! Performance oriented JSON manipulation.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
pub use serde_json_bytes::Value;

/// A JSON object.
pub type Object = Map<ByteString, Value>;

/// Extract a borrowed object out of a [`Value`], or fail with the kind of value found instead.
macro_rules! ensure_object_ref {
    ($value:expr) => {{
        match $value {
            $crate::json_ext::Value::Object(o) => Ok(o),
            other => Err(format!(
                "expected an object, found {}",
                $crate::json_ext::ValueExt::kind(other)
            )),
        }
    }};
}

/// Extension trait for [`Value`].
pub trait ValueExt {
    /// A short name for the JSON type of this value, for error messages.
    fn kind(&self) -> &'static str;
}

impl ValueExt for Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// A path element in a response.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// An index into a list.
    Index(usize),

    /// A key in an object.
    Key(String),
}

/// A path into a response, from the root of `data`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    pub fn empty() -> Path {
        Path(Vec::new())
    }

    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Path {
        Path(
            keys.into_iter()
                .map(|key| PathElement::Key(key.to_string()))
                .collect(),
        )
    }

    pub fn push_key(&mut self, key: impl Into<String>) {
        self.0.push(PathElement::Key(key.into()))
    }

    pub fn push_index(&mut self, index: usize) {
        self.0.push(PathElement::Index(index))
    }

    pub fn pop(&mut self) -> Option<PathElement> {
        self.0.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, element) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match element {
                PathElement::Index(index) => write!(f, "{index}")?,
                PathElement::Key(key) => f.write_str(key)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn path_display() {
        let mut path = Path::from_keys(["repository", "refs", "nodes"]);
        path.push_index(3);
        path.push_key("name");
        assert_eq!(path.to_string(), "repository.refs.nodes.3.name");
        assert_eq!(Path::empty().to_string(), "<root>");
    }

    #[test]
    fn path_serializes_as_graphql_error_path() {
        let mut path = Path::from_keys(["nodes"]);
        path.push_index(1);
        assert_eq!(
            serde_json::to_string(&path).unwrap(),
            r#"["nodes",1]"#.to_string()
        );
    }

    #[test]
    fn ensure_object_reports_kind() {
        let value = json!([1, 2]);
        let error: Result<&Object, String> = ensure_object_ref!(&value);
        assert_eq!(error.unwrap_err(), "expected an object, found array");
        let value = json!({"a": 1});
        let object: Result<&Object, String> = ensure_object_ref!(&value);
        assert_eq!(object.unwrap().len(), 1);
    }
}

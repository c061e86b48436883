//! Cursor-paginated collections.

use serde::Deserialize;
use serde::Serialize;

use crate::decode::Decode;
use crate::decode::DecodeContext;
use crate::error::DecodeError;
use crate::json_ext::Value;
use crate::registry::EntityShape;
use crate::registry::FieldDescriptor;

pub static TOTAL_COUNT: FieldDescriptor = FieldDescriptor::scalar("total_count", "totalCount");
pub static PAGE_INFO: FieldDescriptor =
    FieldDescriptor::object("page_info", "pageInfo", &PAGE_INFO_SHAPE);
pub static NODES: FieldDescriptor = FieldDescriptor::scalar("nodes", "nodes");

pub static END_CURSOR: FieldDescriptor =
    FieldDescriptor::scalar("end_cursor", "endCursor").nullable();
pub static HAS_NEXT_PAGE: FieldDescriptor = FieldDescriptor::scalar("has_next_page", "hasNextPage");

pub static PAGE_INFO_SHAPE: EntityShape = EntityShape {
    name: "page_info",
    typename: "PageInfo",
    base: None,
    fields: &[&END_CURSOR, &HAS_NEXT_PAGE],
};

/// Where a page sits in its collection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

impl PageInfo {
    /// The cursor of the next page, if there is one.
    ///
    /// `end_cursor` is only meaningful while `has_next_page` is set.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page {
            self.end_cursor.as_deref()
        } else {
            None
        }
    }
}

impl Decode for PageInfo {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let node = ctx.object(value)?;
        Ok(Self {
            end_cursor: ctx.required(node, &END_CURSOR)?,
            has_next_page: ctx.required(node, &HAS_NEXT_PAGE)?,
        })
    }
}

/// One page of a connection as it appears in a response.
///
/// `null` entries in `nodes` (objects the token cannot see) are skipped.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Connection<T> {
    pub total_count: i64,
    pub page_info: PageInfo,
    pub nodes: Vec<T>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self {
            total_count: 0,
            page_info: PageInfo::default(),
            nodes: Vec::new(),
        }
    }
}

impl<T> IntoIterator for Connection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl<T: Decode> Decode for Connection<T> {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let node = ctx.object(value)?;
        let nodes: Vec<Option<T>> = ctx.required(node, &NODES)?;
        Ok(Self {
            total_count: ctx.required(node, &TOTAL_COUNT)?,
            page_info: ctx.required(node, &PAGE_INFO)?,
            nodes: nodes.into_iter().flatten().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::json_ext::Object;

    #[test]
    fn end_cursor_is_ignored_on_the_last_page() {
        let info = PageInfo {
            end_cursor: Some("Y3Vyc29yOjI=".to_string()),
            has_next_page: false,
        };
        assert_eq!(info.next_cursor(), None);
    }

    #[test]
    fn null_nodes_are_skipped() {
        let variables = Object::new();
        let mut ctx = DecodeContext::new(&variables);
        let value = json!({
            "totalCount": 3,
            "pageInfo": {"endCursor": null, "hasNextPage": false},
            "nodes": ["a", null, "c"]
        });
        let connection = Connection::<String>::decode(&value, &mut ctx).unwrap();
        assert_eq!(connection.total_count, 3);
        assert_eq!(connection.nodes, ["a", "c"]);
    }

    #[test]
    fn missing_page_info_is_an_error() {
        let variables = Object::new();
        let mut ctx = DecodeContext::new(&variables);
        let value = json!({"totalCount": 0, "nodes": []});
        let error = Connection::<String>::decode(&value, &mut ctx).unwrap_err();
        assert_eq!(error.path().unwrap().to_string(), "pageInfo");
    }
}

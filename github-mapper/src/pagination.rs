//! Walking a collection page by page.

use std::marker::PhantomData;

use futures::Stream;
use tower::BoxError;
use tower::Service;
use tower::ServiceExt;

use crate::decode::Decode;
use crate::error::MappingError;
use crate::json_ext::Value;
use crate::models::connection::Connection;
use crate::models::connection::PageInfo;
use crate::query::QueryRequest;
use crate::query::QuerySpec;
use crate::registry::OperationTarget;

/// One decoded page of a collection.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_info: PageInfo,
    pub total_count: i64,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page_info: PageInfo::default(),
            total_count: 0,
        }
    }
}

impl<T> From<Connection<T>> for Page<T> {
    fn from(connection: Connection<T>) -> Self {
        Self {
            items: connection.nodes,
            page_info: connection.page_info,
            total_count: connection.total_count,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum WalkState {
    HasMore { cursor: Option<String> },
    Exhausted,
}

/// Fetches the pages of a collection operation one at a time, in order.
///
/// Each page is fetched with the end cursor of the previous one. The walk ends after the first
/// page whose `hasNextPage` is false, and after the first error: nothing is retried. The cursor
/// of the failed fetch stays available through [`PageWalker::cursor`], so a caller can resume
/// with [`QueryRequest::with_cursor`].
pub struct PageWalker<S, T> {
    service: S,
    request: QueryRequest,
    state: WalkState,
    cursor: Option<String>,
    pages: usize,
    _item: PhantomData<fn() -> T>,
}

impl<S, T> std::fmt::Debug for PageWalker<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageWalker")
            .field("operation", &self.request.operation())
            .field("state", &self.state)
            .field("pages", &self.pages)
            .finish()
    }
}

impl<S, T> PageWalker<S, T>
where
    S: Service<QuerySpec, Response = Value, Error = BoxError>,
    T: Decode,
{
    /// Prepare a walk of `request`, executed through `service`.
    ///
    /// The request is validated here, so an unknown field or a page size above the maximum
    /// fails before anything is executed. The walk starts at the request's cursor, if any.
    pub fn new(service: S, request: QueryRequest) -> Result<Self, MappingError> {
        let spec = request.build_query()?;
        if !matches!(spec.operation().target, OperationTarget::Collection(_)) {
            return Err(MappingError::NotPaginated(request.operation().to_string()));
        }
        let cursor = request.cursor().map(str::to_string);
        Ok(Self {
            service,
            request,
            state: WalkState::HasMore {
                cursor: cursor.clone(),
            },
            cursor,
            pages: 0,
            _item: PhantomData,
        })
    }

    /// The cursor of the most recent fetch, `None` for the first page.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == WalkState::Exhausted
    }

    /// Fetch the next page, or `None` once the walk is over.
    #[tracing::instrument(skip_all, fields(operation = %self.request.operation()), level = "debug")]
    pub async fn next_page(&mut self) -> Option<Result<Page<T>, MappingError>> {
        let cursor = match &self.state {
            WalkState::HasMore { cursor } => cursor.clone(),
            WalkState::Exhausted => return None,
        };
        self.cursor = cursor.clone();
        let result = self.fetch(cursor).await;
        self.state = match &result {
            Ok(page) => match (page.page_info.has_next_page, &page.page_info.end_cursor) {
                (true, Some(end_cursor)) => WalkState::HasMore {
                    cursor: Some(end_cursor.clone()),
                },
                (true, None) => {
                    tracing::warn!(
                        pages = self.pages,
                        "page reports more results but no end cursor, stopping"
                    );
                    WalkState::Exhausted
                }
                (false, _) => WalkState::Exhausted,
            },
            Err(error) => {
                tracing::debug!(%error, cursor = ?self.cursor, "page fetch failed");
                WalkState::Exhausted
            }
        };
        Some(result)
    }

    async fn fetch(&mut self, cursor: Option<String>) -> Result<Page<T>, MappingError> {
        let spec = self.request.with_cursor(cursor).build_query()?;
        let operation = spec.operation().name;
        tracing::debug!(cursor = ?spec.cursor(), page = self.pages, "fetching page");

        let data = self
            .service
            .ready()
            .await
            .map_err(|source| MappingError::ExecutionFailed {
                operation: operation.to_string(),
                source,
            })?
            .call(spec.clone())
            .await
            .map_err(|source| MappingError::ExecutionFailed {
                operation: operation.to_string(),
                source,
            })?;

        let page = spec
            .decode_page(&data)
            .map_err(|source| MappingError::Decode {
                operation: operation.to_string(),
                source,
            })?;
        self.pages += 1;
        tracing::debug!(
            items = page.items.len(),
            has_next_page = page.page_info.has_next_page,
            "decoded page"
        );
        Ok(page)
    }

    /// The walk as a stream of pages.
    pub fn into_stream(self) -> impl Stream<Item = Result<Page<T>, MappingError>> {
        futures::stream::unfold(self, |mut walker| async move {
            let page = walker.next_page().await?;
            Some((page, walker))
        })
    }

    /// Walk to the end and return every item, or the first error.
    pub async fn collect_all(mut self) -> Result<Vec<T>, MappingError> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await {
            items.extend(page?.items);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::Mutex;

    use futures::StreamExt;
    use serde_json_bytes::json;
    use test_log::test;
    use tower::service_fn;

    use super::*;
    use crate::models::branch::Branch;

    fn branches_page(names: &[&str], end_cursor: Option<&str>, has_next_page: bool) -> Value {
        let nodes: Vec<Value> = names
            .iter()
            .map(|name| json!({"name": name, "target": null}))
            .collect();
        json!({
            "repository": {
                "refs": {
                    "totalCount": 5,
                    "pageInfo": {"endCursor": end_cursor, "hasNextPage": has_next_page},
                    "nodes": nodes
                }
            }
        })
    }

    fn request() -> QueryRequest {
        QueryRequest::builder()
            .operation("repository_branches")
            .argument("owner", "octo")
            .argument("repo", "hello-world")
            .page_size(2)
            .build()
    }

    /// A service answering with canned responses and recording the cursor of every call.
    fn scripted(
        responses: Vec<Result<Value, BoxError>>,
    ) -> (
        impl Service<QuerySpec, Response = Value, Error = BoxError>,
        Arc<Mutex<Vec<Option<String>>>>,
    ) {
        let responses = Arc::new(Mutex::new(VecDeque::from(responses)));
        let cursors = Arc::new(Mutex::new(Vec::new()));
        let seen = cursors.clone();
        let service = service_fn(move |spec: QuerySpec| {
            seen.lock().unwrap().push(spec.cursor().map(str::to_string));
            let response = responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no request past the last page");
            async move { response }
        });
        (service, cursors)
    }

    #[test(tokio::test)]
    async fn walks_until_has_next_page_is_false() {
        let (service, cursors) = scripted(vec![
            Ok(branches_page(&["main", "dev"], Some("Mg"), true)),
            Ok(branches_page(&["feature-a", "feature-b"], Some("NA"), true)),
            Ok(branches_page(&["release"], Some("NQ"), false)),
        ]);
        let mut walker = PageWalker::<_, Branch>::new(service, request()).unwrap();

        let mut names = Vec::new();
        while let Some(page) = walker.next_page().await {
            names.extend(page.unwrap().items.into_iter().map(|branch| branch.name));
        }
        assert_eq!(names, ["main", "dev", "feature-a", "feature-b", "release"]);
        assert_eq!(
            *cursors.lock().unwrap(),
            [None, Some("Mg".to_string()), Some("NA".to_string())]
        );
        assert!(walker.is_exhausted());
        assert!(walker.next_page().await.is_none());
    }

    #[test(tokio::test)]
    async fn error_ends_the_walk_and_keeps_the_cursor() {
        let (service, cursors) = scripted(vec![
            Ok(branches_page(&["main", "dev"], Some("Mg"), true)),
            Err("rate limited".into()),
        ]);
        let mut walker = PageWalker::<_, Branch>::new(service, request()).unwrap();

        assert_eq!(walker.next_page().await.unwrap().unwrap().items.len(), 2);
        let error = walker.next_page().await.unwrap().unwrap_err();
        assert!(matches!(error, MappingError::ExecutionFailed { .. }));
        assert_eq!(walker.cursor(), Some("Mg"));
        assert!(walker.next_page().await.is_none());
        assert_eq!(cursors.lock().unwrap().len(), 2);
    }

    #[test(tokio::test)]
    async fn missing_end_cursor_stops_the_walk() {
        let (service, _) = scripted(vec![Ok(branches_page(&["main"], None, true))]);
        let items = PageWalker::<_, Branch>::new(service, request())
            .unwrap()
            .collect_all()
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test(tokio::test)]
    async fn missing_repository_is_an_empty_walk() {
        let (service, _) = scripted(vec![Ok(json!({"repository": null}))]);
        let pages: Vec<_> = PageWalker::<_, Branch>::new(service, request())
            .unwrap()
            .into_stream()
            .collect()
            .await;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].as_ref().unwrap(), &Page::default());
    }

    #[test(tokio::test)]
    async fn decode_errors_are_attributed_to_the_operation() {
        let (service, _) = scripted(vec![Ok(json!({"repository": {"refs": {"nodes": []}}}))]);
        let error = PageWalker::<_, Branch>::new(service, request())
            .unwrap()
            .collect_all()
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "could not decode the response of 'repository_branches': missing required field at 'repository.refs.totalCount'"
        );
    }

    #[test]
    fn invalid_requests_fail_before_execution() {
        let (service, cursors) = scripted(vec![]);
        let request = QueryRequest::builder()
            .operation("repository_branches")
            .argument("owner", "octo")
            .argument("repo", "hello-world")
            .page_size(1000)
            .build();
        let error = PageWalker::<_, Branch>::new(service, request).unwrap_err();
        assert!(matches!(error, MappingError::PageSizeExceeded { .. }));
        assert!(cursors.lock().unwrap().is_empty());

        let (service, _) = scripted(vec![]);
        let request = QueryRequest::builder()
            .operation("repository_commit")
            .argument("owner", "octo")
            .argument("repo", "hello-world")
            .argument("sha", "9a1b2c3")
            .build();
        let error = PageWalker::<_, Branch>::new(service, request).unwrap_err();
        assert_eq!(
            error.to_string(),
            "operation 'repository_commit' does not return a collection"
        );
    }
}

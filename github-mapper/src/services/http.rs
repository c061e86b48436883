use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Poll;

use displaydoc::Display;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tower::BoxError;
use tower::Service;
use url::Url;

use crate::configuration::Configuration;
use crate::graphql;
use crate::json_ext::Value;
use crate::query::QuerySpec;

/// Longest response body kept in a status error.
const MAX_ERROR_BODY: usize = 512;

/// Errors of the HTTP executor, returned boxed through the execution service.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ExecutionError {
    /// HTTP request failed: {0}
    Http(#[from] reqwest::Error),

    /// could not serialize the request: {0}
    Serialize(#[from] serde_json::Error),

    /// unexpected HTTP status {status}: {body}
    Status { status: StatusCode, body: String },

    /// the API returned errors: {message}
    GraphQL {
        /// The first error, with the number of others.
        message: String,
        errors: Vec<graphql::Error>,
    },

    /// malformed response: {0}
    Malformed(String),
}

impl ExecutionError {
    fn graphql(errors: Vec<graphql::Error>) -> Self {
        let message = match errors.as_slice() {
            [] => "no error message".to_string(),
            [error] => error.to_string(),
            [error, others @ ..] => format!("{error} (and {} more)", others.len()),
        };
        ExecutionError::GraphQL { message, errors }
    }
}

/// Executes query specs against a GraphQL endpoint over HTTP.
///
/// Responses carrying any GraphQL error fail as a whole, even when `data` is partially filled.
#[derive(Clone)]
pub struct HttpExecutor {
    http_client: reqwest::Client,
    endpoint: Arc<Url>,
    token: Option<Arc<str>>,
}

impl std::fmt::Debug for HttpExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExecutor")
            .field("endpoint", &self.endpoint.as_str())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

#[buildstructor::buildstructor]
impl HttpExecutor {
    /// Returns a builder for an executor with an explicit token.
    #[builder]
    pub fn new(configuration: Configuration, token: Option<String>) -> Result<Self, BoxError> {
        let http_client = reqwest::Client::builder()
            .timeout(configuration.timeout)
            .tcp_keepalive(Some(std::time::Duration::from_secs(5)))
            .user_agent(configuration.user_agent.as_str())
            .build()?;
        Ok(Self {
            http_client,
            endpoint: Arc::new(configuration.endpoint),
            token: token.map(Arc::from),
        })
    }
}

impl HttpExecutor {
    /// An executor reading its token from the environment variable named in `configuration`.
    pub fn from_configuration(configuration: Configuration) -> Result<Self, BoxError> {
        let token = configuration.token()?;
        Self::new(configuration, Some(token))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Service<QuerySpec> for HttpExecutor {
    type Response = Value;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, spec: QuerySpec) -> Self::Future {
        let http_client = self.http_client.clone();
        let endpoint = self.endpoint.clone();
        let token = self.token.clone();
        Box::pin(async move {
            let operation = spec.operation().operation_name;
            tracing::debug!(%endpoint, operation, cursor = ?spec.cursor(), "executing query");

            let body = spec.to_request_body().map_err(ExecutionError::from)?;
            let mut request = http_client
                .post(endpoint.as_str())
                .header(CONTENT_TYPE, "application/json")
                .body(body);
            if let Some(token) = &token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await.map_err(ExecutionError::from)?;
            let status = response.status();
            let bytes = response.bytes().await.map_err(ExecutionError::from)?;
            tracing::trace!(%status, len = bytes.len(), "response from the API");

            if !status.is_success() {
                let body = String::from_utf8_lossy(&bytes[..bytes.len().min(MAX_ERROR_BODY)]);
                return Err(ExecutionError::Status {
                    status,
                    body: body.into_owned(),
                }
                .into());
            }

            let response: graphql::Response = serde_json::from_slice(&bytes)
                .map_err(|error| ExecutionError::Malformed(error.to_string()))?;
            if !response.errors.is_empty() {
                return Err(ExecutionError::graphql(response.errors).into());
            }
            match response.data {
                Some(data) if !data.is_null() => Ok(data),
                _ => Err(ExecutionError::Malformed("response has no data".to_string()).into()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;
    use test_log::test;
    use tower::ServiceExt;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::header;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    use super::*;
    use crate::query::QueryRequest;

    fn spec() -> QuerySpec {
        QueryRequest::builder()
            .operation("repository_commit")
            .argument("owner", "octo")
            .argument("repo", "hello-world")
            .argument("sha", "9a1b2c3")
            .build()
            .build_query()
            .unwrap()
    }

    fn executor(server: &MockServer) -> HttpExecutor {
        let configuration = Configuration::builder()
            .endpoint(Url::parse(&format!("{}/graphql", server.uri())).unwrap())
            .build();
        HttpExecutor::builder()
            .configuration(configuration)
            .token("t0ken")
            .build()
            .unwrap()
    }

    #[test(tokio::test)]
    async fn posts_the_query_with_a_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("authorization", "Bearer t0ken"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"repository": {"object": null}}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let data = executor(&server).oneshot(spec()).await.unwrap();
        assert_eq!(data, json!({"repository": {"object": null}}));
    }

    #[test(tokio::test)]
    async fn graphql_errors_fail_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"repository": null},
                "errors": [{
                    "type": "NOT_FOUND",
                    "path": ["repository"],
                    "message": "Could not resolve to a Repository"
                }]
            })))
            .mount(&server)
            .await;

        let error = executor(&server).oneshot(spec()).await.unwrap_err();
        let error = error.downcast::<ExecutionError>().unwrap();
        assert!(matches!(*error, ExecutionError::GraphQL { ref errors, .. } if errors.len() == 1));
        assert_eq!(
            error.to_string(),
            "the API returned errors: Could not resolve to a Repository (at 'repository')"
        );
    }

    #[test(tokio::test)]
    async fn unsuccessful_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
            .mount(&server)
            .await;

        let error = executor(&server).oneshot(spec()).await.unwrap_err();
        let error = error.downcast::<ExecutionError>().unwrap();
        assert!(matches!(
            *error,
            ExecutionError::Status { status: StatusCode::UNAUTHORIZED, ref body }
                if body == "Bad credentials"
        ));
    }

    #[test(tokio::test)]
    async fn response_without_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let error = executor(&server).oneshot(spec()).await.unwrap_err();
        assert_eq!(error.to_string(), "malformed response: response has no data");
    }
}

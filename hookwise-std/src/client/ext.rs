//! Convenience methods on top of [`ApiClient::request`].
//!
//! These are provided for every client, decorated or not, through a blanket
//! implementation.

use async_trait::async_trait;
use hookwise_core::{ApiClient, ApiRequest, ClientError};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// Upper bound on pages fetched by [`ApiClientExt::paginate`].
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Extra request helpers available on every [`ApiClient`].
#[async_trait]
pub trait ApiClientExt: ApiClient {
    /// `GET path` and deserialize the body.
    async fn get_json<T: DeserializeOwned + Send>(&self, path: &str) -> Result<T, ClientError> {
        self.request(ApiRequest::get(path)).await?.json()
    }

    /// Fetch every page of a list endpoint, following `Link: rel="next"`.
    ///
    /// Items of all pages are concatenated. Search-style bodies that wrap the
    /// list in an `items` field are unwrapped. At most `max_pages` pages are
    /// requested.
    async fn paginate(
        &self,
        request: ApiRequest,
        max_pages: usize,
    ) -> Result<Vec<Value>, ClientError> {
        let mut items = Vec::new();
        let mut next = Some(request);
        let mut pages = 0;

        while let Some(request) = next.take() {
            if pages == max_pages {
                break;
            }
            let template = request.clone();
            let response = self.request(request).await?;
            let next_url = response.next_page().map(str::to_string);
            pages += 1;

            match response.body {
                Value::Array(page) => items.extend(page),
                Value::Object(mut object) => match object.remove("items") {
                    Some(Value::Array(page)) => items.extend(page),
                    _ => items.push(Value::Object(object)),
                },
                Value::Null => {}
                other => items.push(other),
            }

            next = next_url.map(|path| ApiRequest {
                path,
                // The next link already carries the query string.
                query: Vec::new(),
                ..template
            });
        }
        Ok(items)
    }

    /// Run a GraphQL query and return its `data`.
    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, ClientError> {
        let response = self
            .request(ApiRequest::post(
                "/graphql",
                json!({ "query": query, "variables": variables }),
            ))
            .await?;

        if let Some(errors) = response.body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let messages = errors
                    .iter()
                    .map(|e| {
                        e.get("message")
                            .and_then(Value::as_str)
                            .map_or_else(|| e.to_string(), str::to_string)
                    })
                    .collect();
                return Err(ClientError::GraphQl(messages));
            }
        }

        Ok(response.body.get("data").cloned().unwrap_or(Value::Null))
    }
}

impl<C: ApiClient + ?Sized> ApiClientExt for C {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClient;
    use hookwise_core::{ApiResponse, ClientScope};

    #[tokio::test]
    async fn paginate_follows_next_links() {
        let client = MockClient::new(ClientScope::App);
        client.respond(
            "/repos/o/r/issues",
            ApiResponse::ok(json!([1, 2])).with_header(
                "link",
                r#"<https://api.github.com/repos/o/r/issues?page=2>; rel="next""#,
            ),
        );
        client.respond(
            "https://api.github.com/repos/o/r/issues?page=2",
            ApiResponse::ok(json!([3])),
        );

        let items = client
            .paginate(ApiRequest::get("/repos/o/r/issues").query("per_page", 2), 10)
            .await
            .unwrap();

        assert_eq!(items, vec![json!(1), json!(2), json!(3)]);
        let sent = client.requests();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].query.is_empty());
    }

    #[tokio::test]
    async fn paginate_respects_page_cap() {
        let client = MockClient::new(ClientScope::App);
        client.respond(
            "/search/issues",
            ApiResponse::ok(json!({ "total_count": 2, "items": [{ "n": 1 }] })).with_header(
                "link",
                r#"<https://api.github.com/search/issues?page=2>; rel="next""#,
            ),
        );

        let items = client
            .paginate(ApiRequest::get("/search/issues"), 1)
            .await
            .unwrap();
        assert_eq!(items, vec![json!({ "n": 1 })]);
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn graphql_surfaces_errors() {
        let client = MockClient::new(ClientScope::App);
        client.respond(
            "/graphql",
            ApiResponse::ok(json!({ "errors": [{ "message": "bad field" }] })),
        );
        let err = client.graphql("{ viewer { login } }", json!({})).await.unwrap_err();
        assert!(matches!(err, ClientError::GraphQl(ref m) if m == &vec!["bad field".to_string()]));
    }

    #[tokio::test]
    async fn graphql_returns_data() {
        let client = MockClient::new(ClientScope::App);
        client.respond(
            "/graphql",
            ApiResponse::ok(json!({ "data": { "viewer": { "login": "octocat" } } })),
        );
        let data = client.graphql("{ viewer { login } }", json!({})).await.unwrap();
        assert_eq!(data["viewer"]["login"], "octocat");
    }
}

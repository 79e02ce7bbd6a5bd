//! Remote list fetching.
//!
//! Every list is fetched fresh on each run; there is no retry and no offline
//! cache, so a failed fetch aborts the run.

use std::time::Duration;

use reqwest::{Client, Response};

/// Sent with every request so list maintainers can identify the tool.
const USER_AGENT: &str = concat!("unbound-blocklist/", env!("CARGO_PKG_VERSION"));

/// Why a list document could not be obtained.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status.
    #[error("{url} answered with status {status}")]
    HttpStatus { url: String, status: u16 },

    /// Connection, TLS or body decoding failure.
    #[error("could not fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The configured request timeout elapsed.
    #[error("gave up on {url} after the request timeout")]
    Timeout { url: String },

    #[error("could not build the HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl FetchError {
    fn transport(url: &str, source: reqwest::Error) -> Self {
        let url = url.to_owned();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }
}

/// Fetches list documents over HTTP(S).
///
/// Redirects are followed and gzip bodies decoded transparently.
#[derive(Debug, Clone)]
pub struct RemoteLoader {
    client: Client,
}

impl RemoteLoader {
    /// Build a loader whose requests are bounded by `timeout`, or by the
    /// transport defaults when `None`.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let builder = Client::builder().user_agent(USER_AGENT).gzip(true);
        let builder = match timeout {
            Some(limit) => builder.timeout(limit),
            None => builder,
        };

        builder
            .build()
            .map(|client| Self { client })
            .map_err(FetchError::ClientBuild)
    }

    /// Download the document at `url` as text.
    ///
    /// Any non-2xx answer is an error, even when it carries a body.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::transport(url, err))
            .and_then(|response| ensure_success(url, response))?;

        let body = response
            .text()
            .await
            .map_err(|err| FetchError::transport(url, err))?;

        tracing::debug!(url = %url, bytes = body.len(), "fetched list");
        Ok(body)
    }
}

fn ensure_success(url: &str, response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(FetchError::HttpStatus {
            url: url.to_owned(),
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn route(server: &MockServer, at: &str, template: ResponseTemplate) -> String {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(template)
            .mount(server)
            .await;
        format!("{}{at}", server.uri())
    }

    fn loader() -> RemoteLoader {
        RemoteLoader::new(Some(Duration::from_secs(5))).unwrap()
    }

    #[tokio::test]
    async fn should_return_body_verbatim() {
        let server = MockServer::start().await;
        let body = "# comment\n0.0.0.0 ads.example.com\n\n";
        let url = route(&server, "/hosts", ResponseTemplate::new(200).set_body_string(body)).await;

        assert_eq!(loader().fetch(&url).await.unwrap(), body);
    }

    #[tokio::test]
    async fn should_reject_non_success_statuses() {
        let server = MockServer::start().await;

        for status in [403_u16, 404, 500, 503] {
            let at = format!("/status-{status}");
            let template = ResponseTemplate::new(status).set_body_string("not a list");
            let url = route(&server, &at, template).await;

            match loader().fetch(&url).await {
                Err(FetchError::HttpStatus { status: got, url: failed }) => {
                    assert_eq!(got, status);
                    assert_eq!(failed, url);
                }
                other => panic!("expected status error for {status}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn should_report_unreachable_host_as_network_error() {
        // Port 1 is reserved and nothing listens there.
        let result = loader().fetch("http://127.0.0.1:1/hosts").await;

        assert!(matches!(result, Err(FetchError::Network { .. })));
    }

    #[tokio::test]
    async fn should_time_out_slow_servers() {
        let server = MockServer::start().await;
        let template = ResponseTemplate::new(200).set_delay(Duration::from_secs(2));
        let url = route(&server, "/slow", template).await;

        let loader = RemoteLoader::new(Some(Duration::from_millis(100))).unwrap();

        assert!(matches!(
            loader.fetch(&url).await,
            Err(FetchError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn should_identify_itself() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("User-Agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(loader().fetch(&server.uri()).await.unwrap(), "ok");
        assert!(USER_AGENT.starts_with("unbound-blocklist/"));
    }

    #[tokio::test]
    async fn should_follow_redirect_to_list() {
        let server = MockServer::start().await;
        let target = route(
            &server,
            "/lists/hosts",
            ResponseTemplate::new(200).set_body_string("0.0.0.0 a.com\n"),
        )
        .await;
        let url = route(
            &server,
            "/latest",
            ResponseTemplate::new(302).append_header("Location", target.as_str()),
        )
        .await;

        assert_eq!(loader().fetch(&url).await.unwrap(), "0.0.0.0 a.com\n");
    }

    #[tokio::test]
    async fn should_accept_empty_list() {
        let server = MockServer::start().await;
        let url = route(&server, "/empty", ResponseTemplate::new(200)).await;

        assert!(loader().fetch(&url).await.unwrap().is_empty());
    }

    #[test]
    fn should_build_without_timeout() {
        assert!(RemoteLoader::new(None).is_ok());
    }
}

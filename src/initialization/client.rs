//! HTTP client initialization.

use reqwest::ClientBuilder;

use crate::error_handling::InitializationError;

/// Initializes the HTTP client used for every hop and page load.
///
/// Redirects are disabled so the chain can be tracked manually, capturing every
/// intermediate URL. Per-request timeouts come from `AnalysisSettings`, so no
/// client-wide timeout is set here.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if the client cannot be built.
pub fn init_redirect_client(user_agent: &str) -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(user_agent.to_string())
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_USER_AGENT;

    #[test]
    fn test_init_redirect_client() {
        assert!(init_redirect_client(DEFAULT_USER_AGENT).is_ok());
    }

    #[tokio::test]
    async fn test_client_does_not_follow_redirects() {
        use httptest::{matchers::*, responders::*, Expectation, Server};

        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/moved"))
                .respond_with(status_code(301).insert_header("Location", "/elsewhere")),
        );
        let client = init_redirect_client("redirect_trace-test").expect("client");
        let response = client
            .get(server.url("/moved").to_string())
            .send()
            .await
            .expect("response");
        assert_eq!(response.status().as_u16(), 301);
    }
}

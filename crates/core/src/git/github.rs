//! GitHub REST API client, used only to check that a stored token works.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
    pub name: Option<String>,
}

/// Outcome of a token check. `valid` is `None` when the answer is unknown
/// (no token, network failure, unexpected status).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenValidation {
    pub valid: Option<bool>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
}

impl TokenValidation {
    fn unknown(message: impl Into<String>) -> Self {
        Self {
            valid: None,
            message: message.into(),
            status_code: None,
            login: None,
        }
    }
}

/// Asynchronous GitHub REST API client.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("ghmulti"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_url,
            token: token.into(),
        })
    }

    /// `GET /user` with the token and classify the answer.
    #[instrument(skip(self), fields(api_url = %self.api_url))]
    pub async fn validate(&self) -> TokenValidation {
        let url = format!("{}/user", self.api_url);
        let resp = match self.http.get(&url).bearer_auth(&self.token).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "token validation request failed");
                return TokenValidation::unknown(format!("Token validation unavailable: {}", e));
            }
        };

        let status = resp.status().as_u16();
        match status {
            200 => {
                let login = resp.json::<GitHubUser>().await.ok().map(|u| u.login);
                TokenValidation {
                    valid: Some(true),
                    message: "Token is valid.".into(),
                    status_code: Some(200),
                    login,
                }
            }
            401 => TokenValidation {
                valid: Some(false),
                message: "Token is invalid or expired.".into(),
                status_code: Some(401),
                login: None,
            },
            other => TokenValidation {
                valid: None,
                message: format!("Token validation returned unexpected status code: {}", other),
                status_code: Some(other),
                login: None,
            },
        }
    }
}

/// Check `token` against `api_url`; an empty token is reported, not sent.
pub async fn validate_token(api_url: &str, token: &str, timeout: Duration) -> TokenValidation {
    if token.trim().is_empty() {
        return TokenValidation::unknown("No token provided.");
    }
    match GitHubClient::new(api_url, token, timeout) {
        Ok(client) => client.validate().await,
        Err(e) => TokenValidation::unknown(format!("Token validation unavailable: {}", e)),
    }
}

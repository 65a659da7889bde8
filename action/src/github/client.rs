//! GitHub REST API client

use reqwest::{header, Client, Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::ActionError;

/// HTTP client for the CI provider's REST API
pub struct GithubClient {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl GithubClient {
    pub fn new(base_url: &str, token: SecretString) -> Result<Self, ActionError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// API base URL from the runner environment, with the public default.
    pub fn base_url_from_env() -> String {
        std::env::var("GITHUB_API_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "https://api.github.com".to_string())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            )
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::USER_AGENT, "fireview")
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ActionError> {
        debug!("GET {}", path);
        let response = self.request(Method::GET, path).send().await?;
        Self::parse(path, "GET", response).await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ActionError> {
        debug!("POST {}", path);
        let response = self.request(Method::POST, path).json(body).send().await?;
        Self::parse(path, "POST", response).await
    }

    /// Make a PATCH request
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ActionError> {
        debug!("PATCH {}", path);
        let response = self.request(Method::PATCH, path).json(body).send().await?;
        Self::parse(path, "PATCH", response).await
    }

    async fn parse<T: DeserializeOwned>(
        path: &str,
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, ActionError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP {} {} failed: {} - {}", method, path, status, body);
            return Err(ActionError::TransportError(format!(
                "{} {}: {}",
                method, status, body
            )));
        }

        let body = response.json().await?;
        Ok(body)
    }
}

//! Common utilities for the Rancher API client
//!
//! Provides the authenticated HTTP wrapper shared by all API calls.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::TokenProvider;
use crate::error::RancherError;

/// Collection envelope returned by Rancher list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub next: Option<String>,
}

/// HTTP client wrapper with authentication
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    tokens: TokenProvider,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: reqwest::Client, base_url: String, tokens: TokenProvider) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Build query string from filters
    pub fn build_query_string(&self, filters: &[(&str, &str)]) -> String {
        if filters.is_empty() {
            String::new()
        } else {
            filters
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&")
        }
    }

    async fn auth_header(&self) -> Result<String, RancherError> {
        let token = self.tokens.token(&self.client, &self.base_url).await?;
        Ok(format!("Bearer {token}"))
    }

    /// Make a GET request
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, RancherError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header().await?)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(RancherError::Http)?;

        let status = response.status();
        if status == 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(RancherError::NotFound(format!(
                "Resource not found: {path} - {body}"
            )));
        }
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(RancherError::Authentication(format!(
                "GET {path} rejected: {status} - {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RancherError::Api(format!(
                "GET {path} failed: {status} - {body}"
            )));
        }

        response.json().await.map_err(RancherError::Http)
    }

    /// Make a POST request
    pub async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, RancherError> {
        let url = self.build_url(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header().await?)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(RancherError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RancherError::Api(format!(
                "POST {path} failed: {status} - {body_text}"
            )));
        }

        response.json().await.map_err(RancherError::Http)
    }

    /// Make a PUT request
    pub async fn put<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, RancherError> {
        let url = self.build_url(path);
        debug!("PUT {}", url);

        let response = self
            .client
            .put(&url)
            .header("Authorization", self.auth_header().await?)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(RancherError::Http)?;

        let status = response.status();
        if status == 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(RancherError::NotFound(format!(
                "Resource not found: {path} - {body}"
            )));
        }
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RancherError::Api(format!(
                "PUT {path} failed: {status} - {body_text}"
            )));
        }

        response.json().await.map_err(RancherError::Http)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), RancherError> {
        let url = self.build_url(path);
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.auth_header().await?)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(RancherError::Http)?;

        let status = response.status();
        if !status.is_success() && status != 204 {
            let body = response.text().await.unwrap_or_default();
            return Err(RancherError::Api(format!(
                "DELETE {path} failed: {status} - {body}"
            )));
        }

        Ok(())
    }

    /// Fetch all pages of a paginated collection
    pub async fn fetch_all_pages<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<Vec<T>, RancherError> {
        let mut url = self.build_url(path);
        let mut all_results = Vec::new();

        loop {
            debug!("Fetching page: {}", url);

            let response = self
                .client
                .get(&url)
                .header("Authorization", self.auth_header().await?)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(RancherError::Http)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(RancherError::Api(format!(
                    "Failed to fetch page: {status} - {body}"
                )));
            }

            let response_text = response.text().await?;
            let page: CollectionResponse<T> = serde_json::from_str(&response_text).map_err(|e| {
                RancherError::Api(format!(
                    "error decoding response body: {} - Response (first 500 chars): {}",
                    e,
                    response_text.chars().take(500).collect::<String>()
                ))
            })?;
            all_results.extend(page.data);

            match page.pagination.and_then(|p| p.next) {
                Some(next_url) => url = self.build_url(&next_url),
                None => break,
            }
        }

        Ok(all_results)
    }
}

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::config::BACKEND_EXTENSION;
use crate::dispatch::{Backend, BackendResponse, RequestContext};
use crate::error::{BridgeError, Result};

/// Fetches service content with HTTP GET on `service_root + path`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    service_root: String,
}

impl HttpBackend {
    pub fn new(service_root: impl Into<String>) -> Result<Self> {
        let service_root = service_root.into();
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|source| BridgeError::Backend {
                url: service_root.clone(),
                source,
            })?;
        Ok(Self {
            client,
            service_root,
        })
    }

    pub fn service_root(&self) -> &str {
        &self.service_root
    }

    /// Full URL for a request.
    pub fn url_for(&self, request: &RequestContext) -> Result<String> {
        let path = request.resolve_path(BACKEND_EXTENSION)?;
        Ok(format!("{}{}", self.service_root, path))
    }
}

impl Backend for HttpBackend {
    fn fetch(&self, request: &RequestContext) -> Result<BackendResponse> {
        let url = self.url_for(request)?;
        debug!(%url, "backend request");

        let backend_err = |source| BridgeError::Backend {
            url: url.clone(),
            source,
        };
        let response = self.client.get(&url).send().map_err(backend_err)?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "backend answered with non-success status");
        }
        let body = response.text().map_err(backend_err)?;
        debug!(%url, size = body.len(), "backend response");

        Ok(BackendResponse::from_body(body))
    }
}

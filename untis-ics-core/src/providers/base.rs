use std::time::Duration;

use reqwest::{Client, ClientBuilder, header};

use crate::{Error, Result};

/// Default request timeout for backend calls
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP client settings shared by providers, before the client is built
pub struct BaseProviderBuilder {
    pub client_builder: ClientBuilder,
    pub info: ProviderInfo,
}

pub struct BaseProvider {
    pub client: Client,
    pub info: ProviderInfo,
}

pub struct ProviderInfo {
    pub name: String,
    pub description: String,
}

impl BaseProviderBuilder {
    pub fn new(info: ProviderInfo) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        headers.insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-cache"),
        );

        let client_builder = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(concat!("untis-ics/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers);

        Self {
            client_builder,
            info,
        }
    }

    pub fn new_with_timeout(info: ProviderInfo, timeout_secs: u64) -> Self {
        let mut s = Self::new(info);
        s.client_builder = s.client_builder.timeout(Duration::from_secs(timeout_secs));
        s
    }

    pub fn build(self) -> Result<BaseProvider> {
        let client = self.client_builder.build()?;

        Ok(BaseProvider {
            client,
            info: self.info,
        })
    }
}

impl BaseProvider {
    /// Map a transport error onto the crate error
    pub fn handle_error_req(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout
        } else if error.is_request() || error.is_connect() {
            Error::Provider {
                provider: self.info.name.clone(),
                message: format!("Request failed: {error}"),
            }
        } else {
            Error::Http(error)
        }
    }

    pub fn custom_error(&self, message: impl Into<String>) -> Error {
        Error::Provider {
            provider: self.info.name.clone(),
            message: message.into(),
        }
    }
}

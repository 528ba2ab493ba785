use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, error};

use crate::config::Settings;
use crate::domain::Identifier;
use crate::error::ObdError;

pub trait ObdClient {
    fn fetch(&self, endpoint: &str, id: &Identifier) -> Result<Value, ObdError>;
}

#[derive(Clone)]
pub struct ObdHttpClient {
    client: Client,
    base_url: String,
}

impl ObdHttpClient {
    pub fn new(settings: &Settings) -> Result<Self, ObdError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("obd-fetch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ObdError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.http_timeout)
            .build()
            .map_err(|err| ObdError::Http(err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
        })
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn handle_status(response: Response) -> Result<Response, ObdError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "OBD request failed".to_string());
        Err(ObdError::Status { status, message })
    }

    fn get_json(&self, url: &str, id: &Identifier) -> Result<Value, ObdError> {
        let response = self
            .client
            .get(url)
            .query(&[("id", id.as_str())])
            .send()
            .map_err(|err| ObdError::Http(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let body = response
            .bytes()
            .map_err(|err| ObdError::Http(err.to_string()))?;
        serde_json::from_slice(&body).map_err(|err| ObdError::InvalidJson(err.to_string()))
    }
}

impl ObdClient for ObdHttpClient {
    fn fetch(&self, endpoint: &str, id: &Identifier) -> Result<Value, ObdError> {
        let url = self.endpoint_url(endpoint);
        debug!(%url, %id, "GET");
        self.get_json(&url, id).inspect_err(|err| {
            error!(endpoint, %id, "error fetching data from API: {err}");
        })
    }
}

use anyhow::Result;
use reqwest::{blocking::Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{config::ApiConfig, connection::ConnectionSettings, creation::TorrentCreationRequest};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("authentication failed")]
    Authentication,
    #[error("daemon error: {0}")]
    Daemon(String),
    #[error("unexpected http status {0}")]
    HttpStatus(StatusCode),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Blocking JSON client for the download-manager daemon. The daemon
/// owns the actual engine connections; this client only submits the
/// normalized values the UI produces.
pub struct ManagerClient {
    http: Client,
    base_url: String,
    auth: Option<(String, Option<String>)>,
}

impl ManagerClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let ApiConfig {
            username,
            password,
            timeout,
            verify_ssl,
            user_agent,
            ..
        } = config;
        let mut builder = Client::builder().timeout(timeout).user_agent(user_agent);
        if !verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build()?;
        let auth = username.map(|user| (user, password));
        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    pub fn create_torrent(&self, request: &TorrentCreationRequest) -> ApiResult<()> {
        self.post("/api/torrents/create", request)
    }

    /// Asks the daemon to probe the given engine; true means the
    /// backend answered.
    pub fn test_connection(&self, settings: &ConnectionSettings) -> ApiResult<bool> {
        let mut response: Option<ConnectionTestResponse> = None;
        self.post_with("/api/client/connection-test", settings, |body| {
            response = serde_json::from_slice(body).ok();
        })?;
        Ok(response.map(|r| r.is_connected).unwrap_or(false))
    }

    fn post<B>(&self, path: &str, body: &B) -> ApiResult<()>
    where
        B: Serialize,
    {
        self.post_with(path, body, |_| {})
    }

    fn post_with<B, F>(&self, path: &str, body: &B, mut on_body: F) -> ApiResult<()>
    where
        B: Serialize,
        F: FnMut(&[u8]),
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.post(&url).json(body);
        if let Some((user, pass)) = &self.auth {
            request = request.basic_auth(user, pass.as_ref());
        }
        let response = request.send()?;
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Authentication),
            status if status.is_success() => {
                let bytes = response.bytes()?;
                on_body(&bytes);
                Ok(())
            }
            status => {
                // The daemon reports failures as a JSON body with a
                // message field and a 500 status.
                let message = response
                    .json::<ErrorBody>()
                    .ok()
                    .and_then(|body| body.message);
                match message {
                    Some(message) => Err(ApiError::Daemon(message)),
                    None => Err(ApiError::HttpStatus(status)),
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConnectionTestResponse {
    #[serde(rename = "isConnected", default)]
    is_connected: bool,
}

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base URL: {url}")]
    InvalidBaseUrl { url: String },

    #[error("base URL cannot carry path segments: {url}")]
    UnsupportedBaseUrl { url: String },

    #[error("failed to build HTTP client: {source}")]
    Build {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {path} failed: {source}")]
    Network {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} answered {status}")]
    Status { path: String, status: u16 },
}

#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub timeout_seconds: usize,
    pub proxy: Option<String>,
    pub follow_redirects: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            proxy: None,
            follow_redirects: false,
        }
    }
}

/// Typed client for the volume server's home-page endpoints.
///
/// Category names travel as exactly one path segment; `path_segments_mut`
/// percent-encodes them, so a name with slashes or spaces cannot change the
/// route.
#[derive(Clone, Debug)]
pub struct HomeClient {
    http: reqwest::Client,
    base: reqwest::Url,
}

impl HomeClient {
    pub fn new(base_url: &str, options: &ClientOptions) -> Result<Self, ClientError> {
        let base =
            reqwest::Url::parse(base_url.trim()).map_err(|_| ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
            })?;
        if base.cannot_be_a_base() {
            return Err(ClientError::UnsupportedBaseUrl {
                url: base_url.to_string(),
            });
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:95.0) Gecko/20100101 Firefox/95.0",
            ),
        );

        let redirect_policy = if options.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        };

        let timeout = Duration::from_secs(options.timeout_seconds.try_into().unwrap_or(10));
        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(redirect_policy)
            .timeout(timeout);

        if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy_url = proxy.to_string();
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| ClientError::ProxySetup {
                proxy: proxy_url,
                source: e,
            })?;
            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .map_err(|e| ClientError::Build { source: e })?;

        Ok(Self { http, base })
    }

    pub fn base(&self) -> &reqwest::Url {
        &self.base
    }

    /// GET `/load/<cat>`; the HTML fragment body populates the panel.
    pub async fn fetch_load(&self, cat: &str) -> Result<String, ClientError> {
        let url = self.endpoint_url(&["load", cat])?;
        self.get_text(url).await
    }

    /// GET `/unload/<cat>`; the (typically empty) body clears the panel.
    pub async fn fetch_unload(&self, cat: &str) -> Result<String, ClientError> {
        let url = self.endpoint_url(&["unload", cat])?;
        self.get_text(url).await
    }

    /// GET `/rsrc/html/quit.html`; the body replaces the page root.
    pub async fn fetch_quit_page(&self) -> Result<String, ClientError> {
        let url = self.endpoint_url(&["rsrc", "html", "quit.html"])?;
        self.get_text(url).await
    }

    /// GET `/action/quit`, fire-and-forget. The server shuts down on
    /// receipt; neither the response nor a failure is of interest.
    pub async fn fire_quit_action(&self) {
        if let Ok(url) = self.endpoint_url(&["action", "quit"]) {
            let _ = self.http.get(url).send().await;
        }
    }

    fn endpoint_url(&self, segments: &[&str]) -> Result<reqwest::Url, ClientError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClientError::UnsupportedBaseUrl {
                    url: self.base.to_string(),
                })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn get_text(&self, url: reqwest::Url) -> Result<String, ClientError> {
        let path = url.path().to_string();
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Network {
                path: path.clone(),
                source: e,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                path,
                status: status.as_u16(),
            });
        }
        response
            .text()
            .await
            .map_err(|e| ClientError::Network { path, source: e })
    }
}

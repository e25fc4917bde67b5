use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::error::FetchError;
use crate::service::calendar_service::PageFetcher;

pub const CHROME_ARGS: [&str; 5] = [
    "--headless",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--window-size=1920,1080",
];

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// Minimal W3C WebDriver client bound to a single browser session.
pub struct WebDriverClient {
    http: reqwest::Client,
    base_url: String,
    session_id: Mutex<Option<String>>,
}

impl WebDriverClient {
    /// Starts a headless Chrome session on the driver at `base_url`.
    pub async fn connect(http: reqwest::Client, base_url: &str) -> Result<Self, FetchError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": CHROME_ARGS }
                }
            }
        });
        info!(driver = %base_url, "initializing chrome webdriver session");
        let value = execute(http.post(format!("{}/session", base_url)).json(&capabilities)).await?;
        let session: NewSession = serde_json::from_value(value)
            .map_err(|e| FetchError::Protocol(format!("new session: {}", e)))?;
        debug!(session = %session.session_id, "webdriver session created");

        Ok(Self {
            http,
            base_url,
            session_id: Mutex::new(Some(session.session_id)),
        })
    }

    async fn session_url(&self, path: &str) -> Result<String, FetchError> {
        let guard = self.session_id.lock().await;
        let id = guard.as_deref().ok_or(FetchError::SessionClosed)?;
        Ok(format!("{}/session/{}{}", self.base_url, id, path))
    }

    pub async fn navigate(&self, url: &str) -> Result<(), FetchError> {
        let endpoint = self.session_url("/url").await?;
        execute(self.http.post(endpoint).json(&json!({ "url": url }))).await?;
        Ok(())
    }

    pub async fn page_source(&self) -> Result<String, FetchError> {
        let endpoint = self.session_url("/source").await?;
        match execute(self.http.get(endpoint)).await? {
            Value::String(source) => Ok(source),
            other => Err(FetchError::Protocol(format!(
                "page source was not a string: {}",
                other
            ))),
        }
    }

    /// Deletes the session. Later calls are no-ops.
    pub async fn quit(&self) -> Result<(), FetchError> {
        let Some(id) = self.session_id.lock().await.take() else {
            return Ok(());
        };
        execute(
            self.http
                .delete(format!("{}/session/{}", self.base_url, id)),
        )
        .await?;
        info!("browser closed successfully");
        Ok(())
    }
}

async fn execute(request: reqwest::RequestBuilder) -> Result<Value, FetchError> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<WireResponse>(&text)
            .ok()
            .and_then(|wire| serde_json::from_value::<WireError>(wire.value).ok())
            .map(|err| format!("{}: {}", err.error, err.message))
            .unwrap_or(text);
        return Err(FetchError::WebDriver {
            status: status.as_u16(),
            message,
        });
    }

    let parsed: WireResponse = serde_json::from_str(&text)
        .map_err(|e| FetchError::Protocol(format!("{}\nRaw body: {}", e, text)))?;
    Ok(parsed.value)
}

/// Page fetcher that drives a WebDriver session and polls the rendered
/// source until the caller's readiness check passes.
pub struct WebDriverFetcher {
    client: WebDriverClient,
    settle: Duration,
    wait: Duration,
    poll: Duration,
}

impl WebDriverFetcher {
    pub fn new(client: WebDriverClient, settle: Duration, wait: Duration) -> Self {
        Self {
            client,
            settle,
            wait,
            poll: Duration::from_millis(500),
        }
    }

    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }
}

#[async_trait]
impl PageFetcher for WebDriverFetcher {
    async fn fetch_until(
        &self,
        url: &str,
        ready: &(dyn for<'s> Fn(&'s str) -> bool + Send + Sync),
    ) -> Result<String, FetchError> {
        self.client.navigate(url).await?;
        sleep(self.settle).await;

        let deadline = Instant::now().checked_add(self.wait);
        loop {
            let source = self.client.page_source().await?;
            if ready(&source) {
                return Ok(source);
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(FetchError::MarkerTimeout(self.wait));
            }
            sleep(self.poll).await;
        }
    }

    async fn page_source(&self) -> Result<String, FetchError> {
        self.client.page_source().await
    }

    async fn close(&self) -> Result<(), FetchError> {
        self.client.quit().await
    }
}

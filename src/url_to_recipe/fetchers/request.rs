use crate::config::FetcherConfig;
use crate::error::FetchError;
use log::{debug, error, info, warn};
use reqwest::Client;
use scraper::Html;
use std::time::Duration;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Parsed HTML of one fetched page.
///
/// Owned by a single scrape and dropped once extraction is done. The tree is
/// not `Send`, so keep it out of scope across `.await` points.
pub struct RecipeDocument {
    url: String,
    html: Html,
}

impl RecipeDocument {
    pub fn parse(url: impl Into<String>, body: &str) -> Self {
        RecipeDocument {
            url: url.into(),
            html: Html::parse_document(body),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn html(&self) -> &Html {
        &self.html
    }
}

/// Single-shot HTTP GET with a browser-like identity.
///
/// Certificate validation is disabled by default (`accept_invalid_certs`):
/// recipe blogs with self-signed or expired certificates are still scraped.
/// This trusts whatever the remote end presents and is a known risk.
/// No retries are made; any failure is returned to the caller immediately.
pub struct RequestFetcher {
    client: Client,
}

impl RequestFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        if config.accept_invalid_certs {
            warn!("TLS certificate validation is disabled for page fetches");
        }
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// Fetch the raw HTML body of `url`.
    pub async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        info!("Fetching page content for URL: {}", url);
        let response = self.client.get(url).send().await.map_err(|e| {
            error!("Error fetching page content for URL: {} - {}", url, e);
            FetchError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("HTTP error occurred: {} for URL: {}", status, url);
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }

    /// Fetch `url` and parse the body into a [`RecipeDocument`].
    pub async fn fetch(&self, url: &str) -> Result<RecipeDocument, FetchError> {
        let body = self.fetch_html(url).await?;
        info!("Successfully fetched and parsed content for URL: {}", url);
        Ok(RecipeDocument::parse(url, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn fetcher() -> RequestFetcher {
        RequestFetcher::new(&FetcherConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/recipe")
            .match_header("user-agent", BROWSER_USER_AGENT)
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><head><title>Cake</title></head><body></body></html>")
            .create();

        let url = format!("{}/recipe", server.url());
        let document = fetcher().fetch(&url).await.unwrap();

        assert_eq!(document.url(), url);
        let title = scraper::Selector::parse("title").unwrap();
        let text: String = document.html().select(&title).flat_map(|t| t.text()).collect();
        assert_eq!(text, "Cake");
        mock.assert();
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("not found")
            .create();

        let url = format!("{}/missing", server.url());
        let result = fetcher().fetch_html(&url).await;

        match result {
            Err(FetchError::Status { status, .. }) => assert_eq!(status.as_u16(), 404),
            other => panic!("expected status error, got {other:?}"),
        }
        mock.assert();
    }

    #[tokio::test]
    async fn test_fetch_transport_failure() {
        // Nothing listens on port 9 (discard) on test hosts
        let result = fetcher().fetch_html("http://127.0.0.1:9/recipe").await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}

//! HTTP client used by the repository client.

use log::debug;
use reqwest::Client;
use std::io::Write;

use super::error::{HttpError, classify_error};

/// HTTP client performing single-attempt GET requests.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Performs a GET request and returns the body as text.
    #[tracing::instrument(skip(self))]
    pub async fn get_text(&self, url: &str) -> Result<String, HttpError> {
        debug!("GET {}...", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(HttpError::Transport)?;

        let response = response.error_for_status().map_err(classify_error)?;

        response.text().await.map_err(HttpError::Transport)
    }

    /// Streams the body of a GET request into `writer`.
    ///
    /// Returns the number of bytes written.
    #[tracing::instrument(skip(self, writer))]
    pub async fn download_to<W: Write>(&self, url: &str, writer: &mut W) -> Result<u64, HttpError> {
        debug!("Downloading file from {}...", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(HttpError::Transport)?;

        let mut response = response.error_for_status().map_err(classify_error)?;

        let mut downloaded_bytes: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(HttpError::Transport)? {
            writer.write_all(&chunk).map_err(HttpError::Write)?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer.flush().map_err(HttpError::Write)?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }
}

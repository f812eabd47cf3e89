use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::model::{DeviceQuery, Origin, SpecSource};

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

/// Where an origin payload comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    File(PathBuf),
    /// URL template; `{brand}` and `{model}` are filled from the query.
    Url(String),
}

impl SourceLocation {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            SourceLocation::Url(raw.to_string())
        } else {
            SourceLocation::File(PathBuf::from(raw))
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLocation::File(p) => write!(f, "{}", p.display()),
            SourceLocation::Url(u) => f.write_str(u),
        }
    }
}

/// Loads already-shaped `SpecSource` documents. Never fails: any problem
/// yields an empty source and a warning.
#[derive(Clone)]
pub struct SourceLoader {
    client: reqwest::Client,
    base_backoff: Duration,
}

impl Default for SourceLoader {
    fn default() -> Self {
        SourceLoader {
            client: reqwest::Client::new(),
            base_backoff: Duration::from_millis(BASE_BACKOFF_MS),
        }
    }
}

impl SourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(
        &self,
        origin: Origin,
        location: Option<&SourceLocation>,
        query: &DeviceQuery,
    ) -> SpecSource {
        let Some(location) = location else {
            debug!(%origin, "no source configured");
            return SpecSource::default();
        };
        let result = match location {
            SourceLocation::File(path) => load_file(path).await,
            SourceLocation::Url(template) => self.fetch(&fill_template(template, query)).await,
        };
        match result {
            Ok(src) => src,
            Err(e) => {
                warn!(%origin, %location, "source unavailable, treating as empty: {e:#}");
                SpecSource::default()
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<SpecSource> {
        for attempt in 0..=MAX_RETRIES {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .with_context(|| format!("GET {}", url))?;
            let status = response.status();

            if status.is_success() {
                let body = response.text().await.context("reading response body")?;
                return serde_json::from_str(&body).context("response is not a spec document");
            }

            let should_retry = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if !should_retry || attempt == MAX_RETRIES {
                bail!("GET {} returned {}", url, status);
            }

            let backoff = self.base_backoff * 2u32.pow(attempt);
            warn!(
                "{} from {} (attempt {}/{}), backing off {:.1}s",
                status,
                url,
                attempt + 1,
                MAX_RETRIES,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
        }
        bail!("GET {} gave up after {} retries", url, MAX_RETRIES)
    }
}

async fn load_file(path: &std::path::Path) -> Result<SpecSource> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn fill_template(template: &str, query: &DeviceQuery) -> String {
    template
        .replace("{brand}", &urlencoding::encode(query.brand.trim()))
        .replace("{model}", &urlencoding::encode(query.model.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations_by_scheme() {
        assert_eq!(
            SourceLocation::parse("https://example.com/{brand}.json"),
            SourceLocation::Url("https://example.com/{brand}.json".into())
        );
        assert_eq!(
            SourceLocation::parse(" data/a34.json "),
            SourceLocation::File(PathBuf::from("data/a34.json"))
        );
    }

    #[test]
    fn template_filled_and_encoded() {
        let q = DeviceQuery::new("Samsung", "Galaxy A34 5G");
        assert_eq!(
            fill_template("http://h/specs?b={brand}&m={model}", &q),
            "http://h/specs?b=Samsung&m=Galaxy%20A34%205G"
        );
        let q = DeviceQuery::new(" Apple ", "iPhone 15 Pro/Max & Co");
        assert_eq!(
            fill_template("http://h/{brand}/{model}.json", &q),
            "http://h/Apple/iPhone%2015%20Pro%2FMax%20%26%20Co.json"
        );
    }

    #[tokio::test]
    async fn file_source_loaded() {
        let loader = SourceLoader::new();
        let loc = SourceLocation::parse("tests/fixtures/pixel_8_unofficial.json");
        let src = loader
            .load(Origin::Unofficial, Some(&loc), &DeviceQuery::new("Google", "Pixel 8"))
            .await;
        assert_eq!(src.name, "Google Pixel 8");
        assert_eq!(src.detail_spec.len(), 3);
    }

    #[tokio::test]
    async fn missing_or_unconfigured_source_is_empty() {
        let loader = SourceLoader::new();
        let q = DeviceQuery::default();
        let loc = SourceLocation::parse("tests/fixtures/does_not_exist.json");
        assert!(loader.load(Origin::Official, Some(&loc), &q).await.is_empty());
        assert!(loader.load(Origin::Official, None, &q).await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_url_is_empty() {
        let loader = SourceLoader::new();
        let loc = SourceLocation::parse("http://127.0.0.1:9/{model}.json");
        let src = loader
            .load(Origin::Official, Some(&loc), &DeviceQuery::new("X", "Y"))
            .await;
        assert!(src.is_empty());
    }
}

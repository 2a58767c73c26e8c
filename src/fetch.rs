use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{Error, Result};

/// Page source for the pipeline. The HTTP implementation keeps a logged-in
/// session; tests substitute canned pages.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn login(&self) -> Result<()>;
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: Client,
    login_url: String,
    login_headers: HeaderMap,
    session_headers: HeaderMap,
    form: Option<Vec<(&'static str, String)>>,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(HttpFetcher {
            client,
            login_url: settings.login.url.clone(),
            login_headers: header_map(&settings.login.headers)?,
            session_headers: header_map(&settings.session.headers)?,
            form: settings.credentials.form(),
        })
    }
}

fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidHeader(name.clone()))?;
        let value =
            HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader(name.to_string()))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn login(&self) -> Result<()> {
        let Some(form) = &self.form else {
            warn!("Credentials incomplete, continuing without login");
            return Ok(());
        };
        info!("Signing into {}", self.login_url);
        let resp = self
            .client
            .post(&self.login_url)
            .headers(self.login_headers.clone())
            .form(form)
            .send()
            .await?;
        debug!(status = %resp.status(), "login response");
        Ok(())
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .headers(self.session_headers.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.text().await?)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_from_settings() {
        let mut raw = HashMap::new();
        raw.insert("User-Agent".to_string(), "Mozilla/5.0".to_string());
        let map = header_map(&raw).unwrap();
        assert_eq!(map["user-agent"], "Mozilla/5.0");
    }

    #[test]
    fn bad_header_name_rejected() {
        let mut raw = HashMap::new();
        raw.insert("Bad Header".to_string(), "x".to_string());
        assert!(matches!(header_map(&raw), Err(Error::InvalidHeader(_))));
    }

    #[tokio::test]
    async fn login_without_credentials_is_skipped() {
        let fetcher = HttpFetcher::new(&Settings::default()).unwrap();
        fetcher.login().await.unwrap();
    }
}

//! Cookie-persisting HTTP session.
//!
//! The SSO handshake needs one request that must *not* follow redirects (the
//! credential POST, whose `Location` header is the result) and many that must.
//! reqwest fixes the redirect policy per client, so [`HttpSession`] holds two
//! blocking clients that share a single cookie jar.

use std::sync::Arc;

use reqwest::blocking::{Client, ClientBuilder, Response};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;

use crate::error::PortalError;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:94.0) Gecko/20100101 Firefox/94.0";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Whether a request should follow `3xx` responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirects {
    Follow,
    Manual,
}

/// What the pipeline needs from a response.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResponse {
    pub status: u16,
    /// Final URL (after redirects, when followed).
    pub url: String,
    /// `Location` header, if any.
    pub location: Option<String>,
    pub body: String,
}

impl PageResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// The HTTP surface the login flow and the retrievers run against.
///
/// Implemented by [`HttpSession`]; tests substitute a scripted fake.
pub trait Transport {
    fn get(&self, url: &str, redirects: Redirects) -> Result<PageResponse, PortalError>;

    fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
        headers: &[(&str, &str)],
        redirects: Redirects,
    ) -> Result<PageResponse, PortalError>;

    /// Cookies the session would send to `url`.
    fn cookies_for(&self, url: &str) -> Vec<(String, String)>;
}

/// Blocking session with browser-like default headers.
///
/// Not meant for concurrent use: one login,
/// a few sequential retrievals, then the session is dropped.
pub struct HttpSession {
    follow: Client,
    manual: Client,
    jar: Arc<Jar>,
}

impl HttpSession {
    /// Build a session. No request is made.
    ///
    /// With `bypass_proxy`, `HTTP_PROXY`/`HTTPS_PROXY` and system proxy settings
    /// are ignored.
    pub fn create(bypass_proxy: bool) -> Result<Self, PortalError> {
        let jar = Arc::new(Jar::default());
        let follow = client_builder(&jar, bypass_proxy)
            .redirect(Policy::limited(10))
            .build()
            .map_err(|e| PortalError::backend(format!("failed to build HTTP client: {e}")))?;
        let manual = client_builder(&jar, bypass_proxy)
            .redirect(Policy::none())
            .build()
            .map_err(|e| PortalError::backend(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { follow, manual, jar })
    }

    fn client(&self, redirects: Redirects) -> &Client {
        match redirects {
            Redirects::Follow => &self.follow,
            Redirects::Manual => &self.manual,
        }
    }
}

impl Transport for HttpSession {
    fn get(&self, url: &str, redirects: Redirects) -> Result<PageResponse, PortalError> {
        tracing::debug!(url, ?redirects, "GET");
        let resp = self
            .client(redirects)
            .get(url)
            .send()
            .map_err(|e| PortalError::backend(format!("GET {url} failed: {e}")))?;
        read_response(resp)
    }

    fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
        headers: &[(&str, &str)],
        redirects: Redirects,
    ) -> Result<PageResponse, PortalError> {
        tracing::debug!(url, ?redirects, fields = form.len(), "POST");
        let mut req = self.client(redirects).post(url).form(form);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let resp = req
            .send()
            .map_err(|e| PortalError::backend(format!("POST {url} failed: {e}")))?;
        read_response(resp)
    }

    fn cookies_for(&self, url: &str) -> Vec<(String, String)> {
        let Ok(parsed) = reqwest::Url::parse(url) else {
            return Vec::new();
        };
        self.jar
            .cookies(&parsed)
            .and_then(|v| v.to_str().ok().map(parse_cookie_header))
            .unwrap_or_default()
    }
}

fn client_builder(jar: &Arc<Jar>, bypass_proxy: bool) -> ClientBuilder {
    let mut builder = Client::builder()
        .cookie_provider(Arc::clone(jar))
        .user_agent(USER_AGENT)
        .default_headers(default_headers());
    if bypass_proxy {
        builder = builder.no_proxy();
    }
    builder
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN"));
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );
    headers
}

fn read_response(resp: Response) -> Result<PageResponse, PortalError> {
    let status = resp.status().as_u16();
    let url = resp.url().to_string();
    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = resp
        .text()
        .map_err(|e| PortalError::backend(format!("failed to read response body from {url}: {e}")))?;
    tracing::debug!(status, %url, bytes = body.len(), "response");

    Ok(PageResponse {
        status,
        url,
        location,
        body,
    })
}

/// Split a `Cookie:` header value (`a=1; b=2`) into pairs.
fn parse_cookie_header(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

//! HTTP access to the weather history site

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::month::MonthCode;

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.12; rv:66.0) Gecko/20100101 Firefox/66.0";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str =
    "zh-CN,zh;q=0.8,zh-TW;q=0.7,zh-HK;q=0.5,en-US;q=0.3,en;q=0.2";
const REFERER_PATH: &str = "/lishi/hainan.html";
/// Redirect hops the availability check follows before giving up
const MAX_INDEX_REDIRECTS: usize = 5;

/// Session settings handed to [`WeatherFetcher::new`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Base URL of the site, without a trailing slash
    pub server: String,
    /// Timeout applied to month page requests
    pub page_timeout: Duration,
    /// Headers sent with every request
    pub headers: HeaderMap,
}

impl FetcherConfig {
    /// Config carrying the desktop browser headers the site expects.
    pub fn browser(server: &str, page_timeout: Duration) -> Result<Self> {
        let server = server.trim_end_matches('/').to_string();
        let url = Url::parse(&server).with_context(|| format!("Invalid server URL: {}", server))?;
        let host = host_header(&url).ok_or_else(|| anyhow!("Server URL has no host: {}", server))?;

        // Accept-Encoding is left to reqwest so gzip/deflate bodies get decoded
        let pairs = [
            (header::HOST, host),
            (header::USER_AGENT, USER_AGENT.to_string()),
            (header::ACCEPT, ACCEPT.to_string()),
            (header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE.to_string()),
            (header::REFERER, format!("{}{}", server, REFERER_PATH)),
            (header::CONNECTION, "keep-alive".to_string()),
            (header::UPGRADE_INSECURE_REQUESTS, "1".to_string()),
            (header::PRAGMA, "no-cache".to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ];

        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            insert_header(&mut headers, name, &value)?;
        }

        Ok(Self {
            server,
            page_timeout,
            headers,
        })
    }
}

/// `host[:port]` as sent in the Host header
fn host_header(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<()> {
    let value = HeaderValue::from_str(value)
        .with_context(|| format!("Invalid value for header {}: {:?}", name, value))?;
    headers.insert(name, value);
    Ok(())
}

/// One persistent session against the site, reused for every request of a run.
pub struct WeatherFetcher {
    client: Client,
    server: String,
    page_timeout: Duration,
}

impl WeatherFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .default_headers(config.headers)
            .redirect(redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            server: config.server,
            page_timeout: config.page_timeout,
        })
    }

    pub fn index_url(&self, city: &str) -> String {
        format!("{}/lishi/{}.html", self.server, city)
    }

    pub fn month_url(&self, city: &str, month: MonthCode) -> String {
        format!("{}/lishi/{}/month/{}.html", self.server, city, month)
    }

    /// True only when the city's index page ends up at a 200. Never errors.
    ///
    /// The session never follows redirects on its own, so this check follows
    /// `Location` itself for up to `MAX_INDEX_REDIRECTS` hops.
    pub fn city_is_available(&self, city: &str) -> bool {
        let index_url = self.index_url(city);
        let mut url = match Url::parse(&index_url) {
            Ok(url) => url,
            Err(err) => {
                warn!(url = %index_url, error = %err, "availability check failed");
                return false;
            }
        };

        for _ in 0..=MAX_INDEX_REDIRECTS {
            let mut request = self.client.get(url.clone());
            if let Some(host) = host_header(&url) {
                request = request.header(header::HOST, host);
            }
            let response = match request.send() {
                Ok(response) => response,
                Err(err) => {
                    warn!(%url, error = %err, "availability check failed");
                    return false;
                }
            };

            let status = response.status();
            debug!(%url, %status, "availability check");
            if !status.is_redirection() {
                return status == StatusCode::OK;
            }

            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|location| url.join(location).ok());
            match location {
                Some(next) => url = next,
                None => {
                    warn!(%url, %status, "redirect without a usable Location");
                    return false;
                }
            }
        }

        warn!(url = %index_url, "availability check gave up after too many redirects");
        false
    }

    /// Raw body of one city-month page. Anything but a 200 is an error.
    pub fn fetch_month(&self, city: &str, month: MonthCode) -> Result<Vec<u8>, FetchError> {
        let url = self.month_url(city, month);
        let transport = |source| FetchError::Transport {
            url: url.clone(),
            source,
        };

        let response = self
            .client
            .get(&url)
            .timeout(self.page_timeout)
            .send()
            .map_err(transport)?;
        let status = response.status();
        let body = response.bytes().map_err(transport)?;
        debug!(%url, %status, bytes = body.len(), "month page");

        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url,
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockSite;
    use wiremock::matchers::{header as header_is, method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn fetcher(site: &MockSite) -> WeatherFetcher {
        let config = FetcherConfig::browser(&site.uri(), Duration::from_secs(10)).unwrap();
        WeatherFetcher::new(config).unwrap()
    }

    fn month(s: &str) -> MonthCode {
        s.parse().unwrap()
    }

    #[test]
    fn test_browser_headers() {
        let config = FetcherConfig::browser("http://www.tianqihoubao.com/", Duration::from_secs(10)).unwrap();
        assert_eq!(config.server, "http://www.tianqihoubao.com");
        assert_eq!(config.headers[header::HOST], "www.tianqihoubao.com");
        assert_eq!(config.headers[header::USER_AGENT], USER_AGENT);
        assert_eq!(
            config.headers[header::REFERER],
            "http://www.tianqihoubao.com/lishi/hainan.html"
        );
        assert_eq!(config.headers[header::CACHE_CONTROL], "no-cache");
        assert!(!config.headers.contains_key(header::ACCEPT_ENCODING));
    }

    #[test]
    fn test_browser_host_keeps_port() {
        let config = FetcherConfig::browser("http://127.0.0.1:8080", Duration::from_secs(1)).unwrap();
        assert_eq!(config.headers[header::HOST], "127.0.0.1:8080");
    }

    #[test]
    fn test_browser_rejects_bad_server() {
        assert!(FetcherConfig::browser("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_urls() {
        let config = FetcherConfig::browser("http://www.tianqihoubao.com", Duration::from_secs(10)).unwrap();
        let fetcher = WeatherFetcher::new(config).unwrap();
        assert_eq!(fetcher.index_url("beijing"), "http://www.tianqihoubao.com/lishi/beijing.html");
        assert_eq!(
            fetcher.month_url("beijing", month("201808")),
            "http://www.tianqihoubao.com/lishi/beijing/month/201808.html"
        );
    }

    #[test]
    fn test_city_available_on_200() {
        let site = MockSite::start();
        site.mount(
            Mock::given(method("GET"))
                .and(path("/lishi/beijing.html"))
                .and(header_is("user-agent", USER_AGENT))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>")),
        );
        assert!(fetcher(&site).city_is_available("beijing"));
    }

    #[test]
    fn test_city_unavailable_on_404() {
        let site = MockSite::start();
        site.mount(
            Mock::given(method("GET"))
                .and(path("/lishi/atlantis.html"))
                .respond_with(ResponseTemplate::new(404)),
        );
        assert!(!fetcher(&site).city_is_available("atlantis"));
    }

    #[test]
    fn test_city_available_through_redirects() {
        let site = MockSite::start();
        site.mount(
            Mock::given(method("GET"))
                .and(path("/lishi/moved.html"))
                .respond_with(ResponseTemplate::new(302).insert_header("location", "/lishi/beijing.html")),
        );
        site.mount(
            Mock::given(method("GET"))
                .and(path("/lishi/beijing.html"))
                .respond_with(ResponseTemplate::new(301).insert_header("location", "beijing-new.html")),
        );
        site.mount(
            Mock::given(method("GET"))
                .and(path("/lishi/beijing-new.html"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>")),
        );
        let fetcher = fetcher(&site);
        assert!(fetcher.city_is_available("beijing"));
        assert!(fetcher.city_is_available("moved"));
        assert_eq!(
            site.requested_paths(),
            [
                "/lishi/beijing.html",
                "/lishi/beijing-new.html",
                "/lishi/moved.html",
                "/lishi/beijing.html",
                "/lishi/beijing-new.html",
            ]
        );
    }

    #[test]
    fn test_city_available_through_absolute_redirect() {
        let site = MockSite::start();
        let target = format!("{}/lishi/shanghai.html", site.uri());
        site.mount(
            Mock::given(method("GET"))
                .and(path("/lishi/sh.html"))
                .respond_with(ResponseTemplate::new(307).insert_header("location", target.as_str())),
        );
        site.mount(
            Mock::given(method("GET"))
                .and(path("/lishi/shanghai.html"))
                .respond_with(ResponseTemplate::new(200)),
        );
        assert!(fetcher(&site).city_is_available("sh"));
    }

    #[test]
    fn test_city_unavailable_when_redirect_ends_badly() {
        let site = MockSite::start();
        site.mount(
            Mock::given(method("GET"))
                .and(path("/lishi/gone.html"))
                .respond_with(ResponseTemplate::new(302).insert_header("location", "/404.html")),
        );
        site.mount(
            Mock::given(method("GET"))
                .and(path("/404.html"))
                .respond_with(ResponseTemplate::new(404)),
        );
        site.mount(
            Mock::given(method("GET"))
                .and(path("/lishi/nowhere.html"))
                .respond_with(ResponseTemplate::new(302)),
        );
        let fetcher = fetcher(&site);
        assert!(!fetcher.city_is_available("gone"));
        assert!(!fetcher.city_is_available("nowhere"));
    }

    #[test]
    fn test_city_unavailable_on_redirect_loop() {
        let site = MockSite::start();
        site.mount(
            Mock::given(method("GET"))
                .and(path("/lishi/loop.html"))
                .respond_with(ResponseTemplate::new(302).insert_header("location", "/lishi/loop.html")),
        );
        assert!(!fetcher(&site).city_is_available("loop"));
        assert_eq!(site.requested_paths().len(), MAX_INDEX_REDIRECTS + 1);
    }

    #[test]
    fn test_city_unavailable_when_unreachable() {
        // Nothing listens on port 9 of the loopback interface
        let config = FetcherConfig::browser("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let fetcher = WeatherFetcher::new(config).unwrap();
        assert!(!fetcher.city_is_available("beijing"));
    }

    #[test]
    fn test_fetch_month_returns_body() {
        let site = MockSite::start();
        site.mount(
            Mock::given(method("GET"))
                .and(path("/lishi/beijing/month/201808.html"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<table></table>".to_vec())),
        );
        let body = fetcher(&site).fetch_month("beijing", month("201808")).unwrap();
        assert_eq!(body, b"<table></table>");
    }

    #[test]
    fn test_fetch_month_non_200_is_error() {
        let site = MockSite::start();
        site.mount(
            Mock::given(method("GET"))
                .and(path("/lishi/beijing/month/201808.html"))
                .respond_with(ResponseTemplate::new(503).set_body_string("busy")),
        );
        let err = fetcher(&site).fetch_month("beijing", month("201808")).unwrap_err();
        match err {
            FetchError::Status { status, body, .. } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "busy");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_fetch_month_does_not_follow_redirects() {
        let site = MockSite::start();
        site.mount(
            Mock::given(method("GET"))
                .and(path("/lishi/beijing/month/201808.html"))
                .respond_with(ResponseTemplate::new(301).insert_header("location", "/")),
        );
        let err = fetcher(&site).fetch_month("beijing", month("201808")).unwrap_err();
        assert!(matches!(err, FetchError::Status { status, .. } if status == StatusCode::MOVED_PERMANENTLY));
    }

    #[test]
    fn test_fetch_month_times_out() {
        let site = MockSite::start();
        site.mount(
            Mock::given(method("GET"))
                .and(path("/lishi/beijing/month/201808.html"))
                .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3))),
        );
        let config = FetcherConfig::browser(&site.uri(), Duration::from_millis(200)).unwrap();
        let fetcher = WeatherFetcher::new(config).unwrap();
        let err = fetcher.fetch_month("beijing", month("201808")).unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }
}

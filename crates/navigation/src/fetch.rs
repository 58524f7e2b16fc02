//! Page fetching: the transport seam and the fallback policy applied on failure.

use std::sync::Arc;

use anyhow::{Error, anyhow};
use futures::future::LocalBoxFuture;
use html::{Document, parse_html};
use log::{debug, warn};
use reqwest::cookie::Jar;
use reqwest::{Client, ClientBuilder};
use tokio::fs::read_to_string as tokio_fs_read_to_string;
use url::Url;

use crate::error::NavigationError;
use crate::window::SharedWindow;

/// Headers sent with every page request so servers can tell engine fetches apart.
pub const REQUEST_HEADERS: &[(&str, &str)] = &[("X-Requested-With", "Taxi")];

/// Status and body of a completed request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// Transport used to retrieve pages.
///
/// An `Err` means the request never produced a response; any response,
/// whatever its status, is returned as `Ok`.
pub trait PageFetcher {
    fn get<'a>(
        &'a self,
        url: &'a Url,
        headers: &'a [(&'static str, &'static str)],
    ) -> LocalBoxFuture<'a, Result<FetchResponse, Error>>;
}

/// What to do when a page cannot be fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchFallback {
    /// Hand the URL to the browser with a full page load.
    HardNavigate,
    /// Report the failure and leave the window alone.
    Suppress,
}

/// Fetches `http`/`https` URLs with reqwest and `file` URLs from disk.
///
/// Requests carry the cookies of the fetcher's jar, which also stores every
/// `Set-Cookie` the site answers with, so session-gated pages load like a
/// same-origin fetch with credentials.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
    cookies: Arc<Jar>,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::with_builder(Client::builder()).unwrap_or_else(|err| {
            warn!("Falling back to a client without cookies: {err}");
            Self {
                client: Client::new(),
                cookies: Arc::default(),
            }
        })
    }
}

impl HttpFetcher {
    /// Build the client from `builder`, attaching a fresh cookie jar.
    ///
    /// # Errors
    /// Returns an error if reqwest cannot build the client.
    pub fn with_builder(builder: ClientBuilder) -> Result<Self, Error> {
        let cookies = Arc::new(Jar::default());
        let client = builder.cookie_provider(Arc::clone(&cookies)).build()?;
        Ok(Self { client, cookies })
    }

    /// The jar requests read cookies from, shared with the host.
    pub fn cookies(&self) -> &Arc<Jar> {
        &self.cookies
    }

    async fn fetch(
        &self,
        url: &Url,
        headers: &[(&'static str, &'static str)],
    ) -> Result<FetchResponse, Error> {
        match url.scheme() {
            "http" | "https" => {
                let mut request = self.client.get(url.clone());
                for (name, value) in headers {
                    request = request.header(*name, *value);
                }
                let response = request
                    .send()
                    .await
                    .map_err(|err| anyhow!("Failed to fetch URL {url}: {err}"))?;
                let status = response.status().as_u16();
                let body = response.text().await?;
                Ok(FetchResponse { status, body })
            }
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| anyhow!("Invalid file path for file url: {url}"))?;
                let body = tokio_fs_read_to_string(path).await?;
                Ok(FetchResponse { status: 200, body })
            }
            _ => Err(anyhow!("Unsupported url scheme {}", url.scheme())),
        }
    }
}

impl PageFetcher for HttpFetcher {
    fn get<'a>(
        &'a self,
        url: &'a Url,
        headers: &'a [(&'static str, &'static str)],
    ) -> LocalBoxFuture<'a, Result<FetchResponse, Error>> {
        Box::pin(self.fetch(url, headers))
    }
}

/// Fetch and parse the page at `url`.
///
/// A transport error or a non-2xx status is returned as an error after
/// applying `fallback`.
///
/// # Errors
/// Returns [`NavigationError::Network`] or [`NavigationError::HttpStatus`].
pub async fn fetch_page(
    fetcher: &dyn PageFetcher,
    window: &SharedWindow,
    url: &Url,
    fallback: FetchFallback,
) -> Result<Document, NavigationError> {
    debug!("Fetching {url}");
    let failure = match fetcher.get(url, REQUEST_HEADERS).await {
        Ok(response) if (200..300).contains(&response.status) => {
            return Ok(parse_html(&response.body));
        }
        Ok(response) => NavigationError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        },
        Err(source) => NavigationError::Network {
            url: url.to_string(),
            source,
        },
    };
    match fallback {
        FetchFallback::HardNavigate => {
            warn!("{failure}; falling back to a full page load");
            window.borrow_mut().hard_navigate(url.as_str());
        }
        FetchFallback::Suppress => warn!("{failure}"),
    }
    Err(failure)
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;
    use std::io::Write as _;
    use std::rc::Rc;

    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;

    use super::*;
    use crate::window::{BrowserWindow, HeadlessWindow};

    struct Canned(u16);

    impl PageFetcher for Canned {
        fn get<'a>(
            &'a self,
            _url: &'a Url,
            headers: &'a [(&'static str, &'static str)],
        ) -> LocalBoxFuture<'a, Result<FetchResponse, Error>> {
            Box::pin(async move {
                assert_eq!(headers, REQUEST_HEADERS);
                Ok(FetchResponse {
                    status: self.0,
                    body: "<title>Fetched</title>".to_owned(),
                })
            })
        }
    }

    #[tokio::test]
    async fn success_parses_body() {
        let window = HeadlessWindow::shared("https://site.test/");
        let shared = Rc::clone(&window) as SharedWindow;
        let url = Url::parse("https://site.test/page").unwrap();
        let page = fetch_page(&Canned(204), &shared, &url, FetchFallback::HardNavigate)
            .await
            .unwrap();
        assert_eq!(page.title(), "Fetched");
        assert!(window.borrow().hard_navigations().is_empty());
    }

    #[tokio::test]
    async fn fallback_decides_whether_the_window_moves() {
        let window = HeadlessWindow::shared("https://site.test/");
        let shared = Rc::clone(&window) as SharedWindow;
        let url = Url::parse("https://site.test/gone").unwrap();

        let err = fetch_page(&Canned(404), &shared, &url, FetchFallback::Suppress)
            .await
            .unwrap_err();
        assert!(matches!(err, NavigationError::HttpStatus { status: 404, .. }));
        assert_eq!(window.borrow().location_href(), "https://site.test/");

        fetch_page(&Canned(503), &shared, &url, FetchFallback::HardNavigate)
            .await
            .unwrap_err();
        assert_eq!(window.borrow().hard_navigations(), ["https://site.test/gone"]);
        assert_eq!(window.borrow().location_href(), "https://site.test/gone");
    }

    #[tokio::test]
    async fn http_fetcher_reads_file_urls() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<title>On disk</title>").unwrap();
        let url = Url::from_file_path(file.path()).unwrap();

        let response = HttpFetcher::default().get(&url, REQUEST_HEADERS).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "<title>On disk</title>");

        let ftp = Url::parse("ftp://site.test/x").unwrap();
        assert!(HttpFetcher::default().get(&ftp, REQUEST_HEADERS).await.is_err());
    }

    #[tokio::test]
    async fn http_fetcher_sends_jar_cookies_and_headers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buffer = vec![0_u8; 8192];
            let mut request = String::new();
            while !request.contains("\r\n\r\n") {
                let read = socket.read(&mut buffer).await.unwrap();
                if read == 0 {
                    break;
                }
                request.push_str(&String::from_utf8_lossy(buffer.get(..read).unwrap()));
            }
            let request = request.to_lowercase();
            let body = format!(
                "cookie={} header={}",
                request.contains("cookie: session=abc"),
                request.contains("x-requested-with: taxi")
            );
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let url = Url::parse(&format!("http://{address}/page")).unwrap();
        let fetcher = HttpFetcher::with_builder(Client::builder().no_proxy()).unwrap();
        fetcher.cookies().add_cookie_str("session=abc", &url);
        let response = fetcher.get(&url, REQUEST_HEADERS).await.unwrap();
        server.await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "cookie=true header=true");
    }

    #[test]
    fn shared_window_handle_coerces() {
        let window: SharedWindow = Rc::new(RefCell::new(HeadlessWindow::new("https://site.test/")));
        window.borrow_mut().push_state("/x");
        assert_eq!(window.borrow().location_href(), "https://site.test/x");
    }
}

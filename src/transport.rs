//! Byte sources for enclosures.
//!
//! A [`Transport`] turns a URL into a readable byte stream plus the declared
//! length, if the source reports one. Remote media goes through reqwest; local
//! media (`file://` URLs and plain paths) is read straight from disk so feeds and
//! tests can point at files.

use crate::config::Config;
use crate::error::{Error, Result, TransferError};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::path::PathBuf;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tracing::debug;
use url::Url;

/// An opened source
pub struct Payload {
    /// Declared length in bytes (e.g. Content-Length), None when not reported
    pub length: Option<u64>,

    /// The byte stream
    pub reader: Box<dyn AsyncRead + Unpin + Send>,
}

impl Payload {
    /// Wrap any reader with an optional declared length
    pub fn new(reader: impl AsyncRead + Unpin + Send + 'static, length: Option<u64>) -> Self {
        Self {
            length,
            reader: Box::new(reader),
        }
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payload")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Opens a URL for reading
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open `url` and return its byte stream
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be reached or refuses the request.
    async fn open(&self, url: &str) -> Result<Payload>;
}

/// Where a media URL points to
#[derive(Clone, Debug, PartialEq, Eq)]
enum Location {
    Remote(Url),
    Local(PathBuf),
}

fn locate(url: &str) -> Result<Location> {
    let unsupported = || {
        Error::Transfer(TransferError::UnsupportedScheme {
            url: url.to_string(),
        })
    };

    match Url::parse(url) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" => Ok(Location::Remote(parsed)),
            "file" => parsed
                .to_file_path()
                .map(Location::Local)
                .map_err(|()| unsupported()),
            // Windows drive letters parse as one-letter schemes
            scheme if scheme.len() == 1 => Ok(Location::Local(PathBuf::from(url))),
            _ => Err(unsupported()),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Location::Local(PathBuf::from(url))),
        Err(_) => Err(unsupported()),
    }
}

/// Streams remote media over HTTP(S)
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport using the timeout and user agent from `config`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Use an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn open_url(&self, url: Url) -> Result<Payload> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| TransferError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let length = response.content_length();
        debug!(url = %url, length = ?length, "opened remote media");

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Payload::new(StreamReader::new(Box::pin(stream)), length))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, url: &str) -> Result<Payload> {
        match locate(url)? {
            Location::Remote(url) => self.open_url(url).await,
            Location::Local(_) => Err(TransferError::UnsupportedScheme {
                url: url.to_string(),
            }
            .into()),
        }
    }
}

/// Reads local media from `file://` URLs or plain paths
#[derive(Clone, Copy, Debug, Default)]
pub struct FileTransport;

impl FileTransport {
    async fn open_path(&self, path: PathBuf) -> Result<Payload> {
        let file = tokio::fs::File::open(&path).await?;
        let length = file.metadata().await.ok().map(|metadata| metadata.len());
        debug!(path = %path.display(), length = ?length, "opened local media");
        Ok(Payload::new(file, length))
    }
}

#[async_trait]
impl Transport for FileTransport {
    async fn open(&self, url: &str) -> Result<Payload> {
        match locate(url)? {
            Location::Local(path) => self.open_path(path).await,
            Location::Remote(_) => Err(TransferError::UnsupportedScheme {
                url: url.to_string(),
            }
            .into()),
        }
    }
}

/// Picks [`HttpTransport`] or [`FileTransport`] by URL scheme
#[derive(Clone, Debug)]
pub struct DefaultTransport {
    http: HttpTransport,
    file: FileTransport,
}

impl DefaultTransport {
    /// Build both transports from `config`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: HttpTransport::new(config)?,
            file: FileTransport,
        })
    }
}

#[async_trait]
impl Transport for DefaultTransport {
    async fn open(&self, url: &str) -> Result<Payload> {
        match locate(url)? {
            Location::Remote(url) => self.http.open_url(url).await,
            Location::Local(path) => self.file.open_path(path).await,
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToExitCode;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn read_all(mut payload: Payload) -> Vec<u8> {
        let mut buf = Vec::new();
        payload.reader.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[test]
    fn locate_classifies_urls_and_paths() {
        assert!(matches!(
            locate("http://media.example/a.mp4").unwrap(),
            Location::Remote(_)
        ));
        assert_eq!(
            locate("file:///srv/media/a.mp4").unwrap(),
            Location::Local(PathBuf::from("/srv/media/a.mp4"))
        );
        assert_eq!(
            locate("media/a.mp4").unwrap(),
            Location::Local(PathBuf::from("media/a.mp4"))
        );
        assert!(matches!(
            locate("ftp://media.example/a.mp4").unwrap_err(),
            Error::Transfer(TransferError::UnsupportedScheme { .. })
        ));
    }

    #[tokio::test]
    async fn http_transport_reports_content_length_and_streams_body() {
        let server = MockServer::start().await;
        let body: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        Mock::given(method("GET"))
            .and(path("/ep/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&Config::default()).unwrap();
        let payload = transport
            .open(&format!("{}/ep/clip.mp4", server.uri()))
            .await
            .unwrap();

        assert_eq!(payload.length, Some(10_000));
        assert_eq!(read_all(payload).await, body);
    }

    #[tokio::test]
    async fn http_transport_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&Config::default()).unwrap();
        let err = transport
            .open(&format!("{}/missing.mp4", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Transfer(TransferError::HttpStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_media_host_is_a_transfer_error() {
        // Reserve a port, then free it so nothing is listening there
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();

        let transport = HttpTransport::new(&Config::default()).unwrap();
        let err = transport
            .open(&format!("http://{addr}/ep/clip.mp4"))
            .await
            .unwrap_err();

        assert!(
            matches!(err, Error::Transfer(TransferError::Request { .. })),
            "got {err:?}"
        );
        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.error_code(), "request_failed");
    }

    #[tokio::test]
    async fn file_transport_reads_file_url_with_length() {
        let dir = TempDir::new().unwrap();
        let media = dir.path().join("clip.mp4");
        std::fs::write(&media, b"not really a video").unwrap();
        let url = Url::from_file_path(&media).unwrap();

        let payload = FileTransport.open(url.as_str()).await.unwrap();

        assert_eq!(payload.length, Some(18));
        assert_eq!(read_all(payload).await, b"not really a video");
    }

    #[tokio::test]
    async fn file_transport_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.mp4");

        let err = FileTransport
            .open(missing.to_str().unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn default_transport_dispatches_by_scheme() {
        let dir = TempDir::new().unwrap();
        let media = dir.path().join("clip.mp4");
        std::fs::write(&media, b"local").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"remote".to_vec()))
            .mount(&server)
            .await;

        let transport = DefaultTransport::new(&Config::default()).unwrap();

        let local = transport.open(media.to_str().unwrap()).await.unwrap();
        assert_eq!(read_all(local).await, b"local");

        let remote = transport
            .open(&format!("{}/clip.mp4", server.uri()))
            .await
            .unwrap();
        assert_eq!(read_all(remote).await, b"remote");
    }
}

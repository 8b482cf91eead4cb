//! Minimal HTTP/1.1 POST over a tokio TCP stream.
//!
//! Enough to talk JSON-RPC to a local or LAN validator without pulling an
//! HTTP client stack into the library. Plain `http://` only; put a TLS
//! terminating proxy in front of a remote endpoint.

use std::fmt;
use std::str::FromStr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

use super::ClusterError;

/// A parsed `http://host[:port][/path][?query]` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
    path: String,
}

impl Endpoint {
    /// Host as it goes on the wire; IPv6 literals keep their brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Request target: path plus query, if any.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}:{}{}", self.host, self.port, self.path)
    }
}

impl TryFrom<Url> for Endpoint {
    type Error = ClusterError;

    fn try_from(url: Url) -> Result<Self, Self::Error> {
        if url.scheme() != "http" {
            return Err(ClusterError::Endpoint(format!(
                "unsupported scheme `{}` in {}",
                url.scheme(),
                url
            )));
        }
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ClusterError::Endpoint(format!("missing host in {}", url)))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ClusterError::Endpoint(format!("missing port in {}", url)))?;
        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        Ok(Endpoint { host, port, path })
    }
}

impl FromStr for Endpoint {
    type Err = ClusterError;

    /// A bare `host[:port][/path]` is taken as `http://`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = if s.contains("://") {
            s.parse::<Url>()
        } else {
            format!("http://{}", s).parse::<Url>()
        };
        let url = parsed.map_err(|e| ClusterError::Endpoint(format!("invalid URL {}: {}", s, e)))?;
        Endpoint::try_from(url)
    }
}

/// POST `body` as JSON and return the response body.
pub async fn post_json(endpoint: &Endpoint, body: &[u8]) -> Result<Vec<u8>, ClusterError> {
    let addr = format!("{}:{}", endpoint.host, endpoint.port);
    let mut stream = TcpStream::connect(&addr).await?;

    let head = format!(
        "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        endpoint.path,
        endpoint.host,
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.flush().await?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;
    parse_response(&raw, endpoint)
}

/// Split a raw HTTP/1.1 response into status and body, undoing chunked
/// transfer encoding when present.
pub(crate) fn parse_response(raw: &[u8], endpoint: &Endpoint) -> Result<Vec<u8>, ClusterError> {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| ClusterError::Decode("response has no header terminator".into()))?;
    let head = String::from_utf8_lossy(&raw[..split]);
    let body = &raw[split + 4..];

    let mut lines = head.split("\r\n");
    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| ClusterError::Decode("malformed status line".into()))?;
    if !(200..300).contains(&status) {
        return Err(ClusterError::Http {
            status,
            endpoint: endpoint.to_string(),
        });
    }

    let chunked = lines.any(|line| {
        line.split_once(':').is_some_and(|(name, value)| {
            name.trim().eq_ignore_ascii_case("transfer-encoding")
                && value.trim().eq_ignore_ascii_case("chunked")
        })
    });
    if chunked {
        decode_chunked(body)
    } else {
        Ok(body.to_vec())
    }
}

fn decode_chunked(mut body: &[u8]) -> Result<Vec<u8>, ClusterError> {
    let mut out = Vec::new();
    loop {
        let line_end = body
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or_else(|| ClusterError::Decode("truncated chunk header".into()))?;
        let size_field = String::from_utf8_lossy(&body[..line_end]);
        let size_hex = size_field.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| ClusterError::Decode(format!("bad chunk size `{}`", size_hex)))?;
        body = &body[line_end + 2..];
        if size == 0 {
            return Ok(out);
        }
        if body.len() < size + 2 {
            return Err(ClusterError::Decode("truncated chunk body".into()));
        }
        out.extend_from_slice(&body[..size]);
        body = &body[size + 2..];
    }
}

//! Minimal HTTP GET over a raw TCP connection.
//!
//! One request per connection: the request line and headers are written, then
//! the response is read until the server closes. Header lines are skipped up
//! to the first blank line and the remaining lines form the body.

use crate::error::FetchError;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code from the status line, if it could be parsed.
    pub status: Option<u16>,
    /// Raw header lines, status line excluded.
    pub headers: Vec<String>,
    pub body: String,
}

/// Request text for `url`: request line, `Host`, `Connection: close`, blank line.
pub fn craft_request(url: &Url) -> Result<String, FetchError> {
    let host = url
        .host_str()
        .ok_or_else(|| FetchError::MissingHost(url.to_string()))?;
    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    Ok(format!(
        "GET {target} HTTP/1.0\r\nHost: {host}\r\nConnection: close\r\n\r\n"
    ))
}

/// Fetches `url`. `timeout` bounds the connect and every read and write.
pub fn fetch(url: &Url, timeout: Option<Duration>) -> Result<HttpResponse, FetchError> {
    if url.scheme() != "http" {
        return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
    }
    let host = url
        .host_str()
        .ok_or_else(|| FetchError::MissingHost(url.to_string()))?;
    let port = url.port_or_known_default().unwrap_or(80);
    let request = craft_request(url)?;

    let mut stream = connect(host, port, timeout)?;
    stream.set_read_timeout(timeout)?;
    stream.set_write_timeout(timeout)?;
    debug!(%url, host, port, "sending request");
    stream.write_all(request.as_bytes())?;
    stream.flush()?;

    let response = read_response(BufReader::new(stream))?;
    debug!(%url, status = ?response.status, bytes = response.body.len(), "fetched");
    Ok(response)
}

/// Fetches `url` and returns only the body.
pub fn fetch_html(url: &Url, timeout: Option<Duration>) -> Result<String, FetchError> {
    fetch(url, timeout).map(|response| response.body)
}

fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<TcpStream, FetchError> {
    let Some(timeout) = timeout else {
        return Ok(TcpStream::connect((host, port))?);
    };
    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }
    match last_error {
        Some(e) => Err(e.into()),
        None => Err(FetchError::Unresolved(format!("{host}:{port}"))),
    }
}

/// Reads a response: status line, headers up to the first blank line, body.
/// Body lines are joined with `\n`; invalid UTF-8 is replaced.
pub fn read_response<R: BufRead>(mut reader: R) -> Result<HttpResponse, FetchError> {
    let mut status = None;
    let mut headers = Vec::new();
    let mut first = true;
    while let Some(line) = next_line(&mut reader)? {
        if line.trim().is_empty() {
            break;
        }
        if first {
            first = false;
            status = parse_status(&line);
            if status.is_some() {
                continue;
            }
        }
        headers.push(line);
    }

    let mut lines = Vec::new();
    while let Some(line) = next_line(&mut reader)? {
        lines.push(line);
    }
    Ok(HttpResponse {
        status,
        headers,
        body: lines.join("\n"),
    })
}

fn next_line<R: BufRead>(reader: &mut R) -> std::io::Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

fn parse_status(line: &str) -> Option<u16> {
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

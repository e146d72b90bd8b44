//! Minimal blocking HTTP/1.1 framing over any Read + Write stream.
//!
//! One request per connection, GET-style requests only: a request body is
//! never read, and every response closes the connection.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Maximum header section size (32 KiB)
const MAX_HEADER_SIZE: usize = 32 * 1024;

const MAX_HEADERS: usize = 64;

#[derive(Debug)]
pub struct HttpRequest {
    pub method: String,
    /// Request target including any query string.
    pub target: String,
}

impl HttpRequest {
    /// Splits the target into path and raw query string.
    pub fn path_and_query(&self) -> (&str, &str) {
        self.target
            .split_once('?')
            .unwrap_or((self.target.as_str(), ""))
    }
}

#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn html(status: u16, body: String) -> Self {
        Self {
            status,
            headers: vec![(
                "Content-Type".to_string(),
                "text/html; charset=utf-8".to_string(),
            )],
            body: body.into_bytes(),
        }
    }

    pub fn redirect(location: &str) -> Self {
        Self {
            status: 303,
            headers: vec![("Location".to_string(), location.to_string())],
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[cfg(test)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("connection closed mid-request")]
    Truncated,
    #[error("headers too large")]
    HeadersTooLarge,
    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),
    #[error("read error: {0}")]
    Io(#[from] io::Error),
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        303 => "See Other",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    }
}

/// Reads and parses one request head from a stream.
///
/// Returns `Ok(None)` if the peer closed the connection before sending
/// anything.
pub fn read_request(stream: &mut impl Read) -> Result<Option<HttpRequest>, RequestError> {
    let mut head = Vec::with_capacity(1024);
    let mut byte = [0u8; 1];

    // Byte-wise so nothing past the header block is consumed.
    loop {
        match stream.read(&mut byte) {
            Ok(0) if head.is_empty() => return Ok(None),
            Ok(0) => return Err(RequestError::Truncated),
            Ok(_) => {
                head.push(byte[0]);
                if head.len() > MAX_HEADER_SIZE {
                    return Err(RequestError::HeadersTooLarge);
                }
                if head.ends_with(b"\r\n\r\n") {
                    break;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) if head.is_empty() => return Ok(None),
            Err(err) => return Err(err.into()),
        }
    }

    let mut parsed_headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut parsed_headers);
    if req.parse(&head)?.is_partial() {
        return Err(RequestError::Truncated);
    }

    Ok(Some(HttpRequest {
        method: req.method.unwrap_or("").to_string(),
        target: req.path.unwrap_or("/").to_string(),
    }))
}

pub fn write_response(stream: &mut impl Write, response: &HttpResponse) -> io::Result<()> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        reason(response.status),
        response.body.len()
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    stream.write_all(head.as_bytes())?;
    stream.write_all(&response.body)?;
    stream.flush()
}

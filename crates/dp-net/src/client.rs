//! Blocking HTTP/1.1 client.

use crate::http::Header;
use crate::http::HttpMethod;
use crate::http::HttpRequest;
use crate::http::HttpResponse;
use crate::http::HttpStatusCode;
use crate::http::HttpVersion;
use crate::tls::TlsPolicy;
use crate::tls_backend::connect_tls;
use crate::transport::BoxedIoStream;
use crate::transport::connect;
use brotli::Decompressor;
use dp_core::PortalError;
use dp_core::PortalResult;
use flate2::read::DeflateDecoder;
use flate2::read::GzDecoder;
use flate2::read::ZlibDecoder;
use std::io::Cursor;
use std::io::Read;
use std::io::Write;
use std::time::Duration;

const MAX_RESPONSE_HEAD_BYTES: usize = 128 * 1024;
const MAX_CHUNK_LINE_BYTES: usize = 8 * 1024;

/// One connection per request; every request is sent with `Connection: close`.
#[derive(Debug, Clone)]
pub struct Http11Client {
    tls_policy: TlsPolicy,
    timeout: Duration,
}

impl Http11Client {
    pub fn new(tls_policy: TlsPolicy, timeout: Duration) -> PortalResult<Self> {
        tls_policy.validate()?;
        Ok(Self {
            tls_policy,
            timeout,
        })
    }

    pub fn execute(&self, request: &HttpRequest) -> PortalResult<HttpResponse> {
        let handshake = self.tls_policy.handshake_config_for(&request.url)?;
        let tcp = connect(request.url.host(), request.url.port(), self.timeout)?;
        let mut stream: BoxedIoStream = match &handshake {
            Some(handshake) => connect_tls(tcp, handshake, &self.tls_policy)?,
            None => Box::new(tcp),
        };

        write_request(&mut *stream, request)?;
        let response = read_response(&mut *stream, request.method)?;
        tracing::debug!(
            url = request.url.as_str(),
            status = response.status.as_u16(),
            bytes = response.body.len(),
            "http response"
        );
        Ok(response)
    }
}

fn write_request<W: Write + ?Sized>(stream: &mut W, request: &HttpRequest) -> PortalResult<()> {
    let mut encoded = Vec::new();
    encoded.extend_from_slice(request.method.as_str().as_bytes());
    encoded.push(b' ');
    encoded.extend_from_slice(request.request_target().as_bytes());
    encoded.push(b' ');
    encoded.extend_from_slice(HttpVersion::Http11.as_str().as_bytes());
    encoded.extend_from_slice(b"\r\n");

    for header in &request.headers {
        encoded.extend_from_slice(header.name.as_bytes());
        encoded.extend_from_slice(b": ");
        encoded.extend_from_slice(header.value.as_bytes());
        encoded.extend_from_slice(b"\r\n");
    }
    if request.header("connection").is_none() {
        encoded.extend_from_slice(b"Connection: close\r\n");
    }
    encoded.extend_from_slice(b"\r\n");

    stream
        .write_all(&encoded)
        .and_then(|()| stream.flush())
        .map_err(|error| {
            PortalError::transport(
                "net.http.write_failed",
                format!("failed to write HTTP request bytes: {error}"),
            )
        })
}

fn read_response<R: Read + ?Sized>(stream: &mut R, method: HttpMethod) -> PortalResult<HttpResponse> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];
    let header_end = loop {
        if let Some(end) = find_header_end(&buffer) {
            break end;
        }

        let read = stream.read(&mut chunk).map_err(|error| {
            PortalError::transport(
                "net.http.read_head_failed",
                format!("failed while reading HTTP response head: {error}"),
            )
        })?;
        if read == 0 {
            return Err(PortalError::transport(
                "net.http.unexpected_eof",
                "unexpected EOF before response head completed",
            ));
        }

        buffer.extend_from_slice(&chunk[..read]);
        if buffer.len() > MAX_RESPONSE_HEAD_BYTES {
            return Err(PortalError::transport(
                "net.http.head_too_large",
                format!("HTTP response head exceeds {MAX_RESPONSE_HEAD_BYTES} bytes"),
            ));
        }
    };

    let head_text = std::str::from_utf8(&buffer[..header_end]).map_err(|error| {
        PortalError::transport(
            "net.http.head_invalid_utf8",
            format!("HTTP response head is not valid UTF-8 text: {error}"),
        )
    })?;
    let mut lines = head_text.split("\r\n");
    let (version, status) = parse_status_line(lines.next().unwrap_or_default())?;

    let mut headers = Vec::new();
    for line in lines.filter(|line| !line.is_empty()) {
        let (name, value) = line.split_once(':').ok_or_else(|| {
            PortalError::transport(
                "net.http.header_invalid",
                format!("invalid HTTP header line `{line}`"),
            )
        })?;
        headers.push(Header::new(name.trim(), value.trim())?);
    }

    let prefetched = buffer[header_end..].to_vec();
    if method == HttpMethod::Head || status_disallows_body(status.as_u16()) {
        return Ok(HttpResponse {
            version,
            status,
            headers,
            body: Vec::new(),
        });
    }

    let chunked = header_contains(&headers, "transfer-encoding", "chunked");
    if !chunked && headers.iter().any(|h| h.name.eq_ignore_ascii_case("transfer-encoding")) {
        return Err(PortalError::transport(
            "net.http.transfer_encoding_unsupported",
            "only chunked transfer encoding is supported",
        ));
    }

    let raw_body = if chunked {
        read_chunked_body(stream, prefetched)?
    } else if let Some(len) = parse_content_length(&headers)? {
        read_sized_body(stream, prefetched, len)?
    } else {
        let mut body = prefetched;
        stream.read_to_end(&mut body).map_err(|error| {
            PortalError::transport(
                "net.http.read_body_failed",
                format!("failed while draining response body: {error}"),
            )
        })?;
        body
    };

    Ok(HttpResponse {
        version,
        status,
        body: decode_content_encoding(&headers, raw_body)?,
        headers,
    })
}

fn read_sized_body<R: Read + ?Sized>(
    stream: &mut R,
    mut body: Vec<u8>,
    len: usize,
) -> PortalResult<Vec<u8>> {
    if body.len() >= len {
        body.truncate(len);
        return Ok(body);
    }

    let mut rest = vec![0_u8; len.saturating_sub(body.len())];
    stream.read_exact(&mut rest).map_err(|error| {
        PortalError::transport(
            "net.http.read_body_failed",
            format!("failed to read HTTP body bytes: {error}"),
        )
    })?;
    body.extend_from_slice(&rest);
    Ok(body)
}

struct PrefixedStreamReader<'a, R: Read + ?Sized> {
    prefetched: Vec<u8>,
    offset: usize,
    stream: &'a mut R,
}

impl<R: Read + ?Sized> PrefixedStreamReader<'_, R> {
    fn read_exact_into(&mut self, out: &mut [u8]) -> PortalResult<()> {
        let available = self.prefetched.len().saturating_sub(self.offset);
        let take = available.min(out.len());
        if take > 0 {
            let end = self.offset.saturating_add(take);
            out[..take].copy_from_slice(&self.prefetched[self.offset..end]);
            self.offset = end;
        }

        if take < out.len() {
            self.stream.read_exact(&mut out[take..]).map_err(|error| {
                PortalError::transport(
                    "net.http.read_body_failed",
                    format!("failed while reading chunked HTTP body: {error}"),
                )
            })?;
        }
        Ok(())
    }

    fn read_crlf_line(&mut self) -> PortalResult<String> {
        let mut line = Vec::new();
        loop {
            let mut byte = [0_u8; 1];
            self.read_exact_into(&mut byte)?;
            line.push(byte[0]);

            if line.len() > MAX_CHUNK_LINE_BYTES {
                return Err(PortalError::transport(
                    "net.http.chunk_line_too_large",
                    format!("chunk metadata line exceeds {MAX_CHUNK_LINE_BYTES} bytes"),
                ));
            }

            if line.ends_with(b"\r\n") {
                line.truncate(line.len().saturating_sub(2));
                return String::from_utf8(line).map_err(|error| {
                    PortalError::transport(
                        "net.http.chunk_line_invalid_utf8",
                        format!("chunk metadata line is not valid UTF-8: {error}"),
                    )
                });
            }
        }
    }
}

fn read_chunked_body<R: Read + ?Sized>(
    stream: &mut R,
    prefetched: Vec<u8>,
) -> PortalResult<Vec<u8>> {
    let mut reader = PrefixedStreamReader {
        prefetched,
        offset: 0,
        stream,
    };
    let mut decoded = Vec::new();

    loop {
        let size_line = reader.read_crlf_line()?;
        if size_line.is_empty() {
            continue;
        }

        let size_token = size_line.split(';').next().unwrap_or_default().trim();
        let chunk_size = usize::from_str_radix(size_token, 16).map_err(|error| {
            PortalError::transport(
                "net.http.chunk_size_invalid",
                format!("invalid chunk size `{size_token}`: {error}"),
            )
        })?;

        if chunk_size == 0 {
            // Trailers end with an empty line.
            while !reader.read_crlf_line()?.is_empty() {}
            return Ok(decoded);
        }

        let start = decoded.len();
        decoded.resize(start.saturating_add(chunk_size), 0);
        reader.read_exact_into(&mut decoded[start..])?;

        let mut terminator = [0_u8; 2];
        reader.read_exact_into(&mut terminator)?;
        if terminator != *b"\r\n" {
            return Err(PortalError::transport(
                "net.http.chunk_terminator_invalid",
                "chunk data is missing trailing CRLF",
            ));
        }
    }
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|idx| idx.saturating_add(4))
}

fn parse_status_line(line: &str) -> PortalResult<(HttpVersion, HttpStatusCode)> {
    let invalid = || {
        PortalError::transport(
            "net.http.status_line_invalid",
            format!("invalid status line `{line}`"),
        )
    };
    let mut parts = line.splitn(3, ' ');
    let version = match parts.next() {
        Some("HTTP/1.0") => HttpVersion::Http10,
        Some("HTTP/1.1") => HttpVersion::Http11,
        Some(other) if other.starts_with("HTTP/") => {
            return Err(PortalError::transport(
                "net.http.version_unsupported",
                format!("unsupported response version `{other}`"),
            ));
        }
        _ => return Err(invalid()),
    };
    let code = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(invalid)?;

    Ok((version, HttpStatusCode::new(code)?))
}

fn parse_content_length(headers: &[Header]) -> PortalResult<Option<usize>> {
    let mut value: Option<usize> = None;
    for header in headers
        .iter()
        .filter(|header| header.name.eq_ignore_ascii_case("content-length"))
    {
        let parsed = header.value.trim().parse::<usize>().map_err(|error| {
            PortalError::transport(
                "net.http.content_length_invalid",
                format!("invalid Content-Length `{}`: {error}", header.value),
            )
        })?;
        match value {
            Some(existing) if existing != parsed => {
                return Err(PortalError::transport(
                    "net.http.content_length_conflict",
                    "conflicting Content-Length headers in response",
                ));
            }
            _ => value = Some(parsed),
        }
    }

    Ok(value)
}

fn status_disallows_body(status_code: u16) -> bool {
    (100..200).contains(&status_code) || status_code == 204 || status_code == 304
}

fn header_contains(headers: &[Header], name: &str, value: &str) -> bool {
    headers.iter().any(|header| {
        header.name.eq_ignore_ascii_case(name)
            && header
                .value
                .split(',')
                .any(|token| token.trim().eq_ignore_ascii_case(value))
    })
}

fn decode_content_encoding(headers: &[Header], body: Vec<u8>) -> PortalResult<Vec<u8>> {
    let encodings: Vec<String> = headers
        .iter()
        .filter(|header| header.name.eq_ignore_ascii_case("content-encoding"))
        .flat_map(|header| header.value.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();

    let mut decoded = body;
    for encoding in encodings.iter().rev() {
        decoded = match encoding.as_str() {
            "identity" => decoded,
            "gzip" | "x-gzip" => read_all(GzDecoder::new(Cursor::new(decoded)), "gzip")?,
            "deflate" => decode_deflate(decoded)?,
            "br" => read_all(Decompressor::new(Cursor::new(decoded), 4096), "brotli")?,
            _ => {
                return Err(PortalError::transport(
                    "net.http.content_encoding_unsupported",
                    format!("unsupported content encoding `{encoding}`"),
                ));
            }
        };
    }

    Ok(decoded)
}

fn decode_deflate(body: Vec<u8>) -> PortalResult<Vec<u8>> {
    let mut zlib = Vec::new();
    if ZlibDecoder::new(Cursor::new(&body))
        .read_to_end(&mut zlib)
        .is_ok()
    {
        return Ok(zlib);
    }
    read_all(DeflateDecoder::new(Cursor::new(body)), "deflate")
}

fn read_all(mut reader: impl Read, label: &str) -> PortalResult<Vec<u8>> {
    let mut decoded = Vec::new();
    reader.read_to_end(&mut decoded).map_err(|error| {
        PortalError::transport(
            "net.http.decode_failed",
            format!("{label} decode failed: {error}"),
        )
    })?;
    Ok(decoded)
}

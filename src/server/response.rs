use http::header::{HeaderValue, CONTENT_LENGTH};
use http::{HeaderMap, StatusCode};
use std::io::{self, Write};
use tracing::debug;

/// Transport side of a response.
///
/// Headers may be modified until [`commit`](Self::commit) is called; the
/// body may only be written after that.
pub trait ResponseSink {
    fn set_status(&mut self, status: StatusCode);
    fn status(&self) -> Option<StatusCode>;
    fn headers_mut(&mut self) -> &mut HeaderMap;
    /// Send status and headers; later header changes are lost.
    fn commit(&mut self);
    fn is_committed(&self) -> bool;
    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory [`ResponseSink`]; used for embedding and in tests.
#[derive(Debug, Default, Clone)]
pub struct BufferedResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    committed: bool,
}

impl BufferedResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status set by dispatch; 200 when nothing was set.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as UTF-8 text (lossy).
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Convert into an `http::Response`.
    #[must_use]
    pub fn into_http(self) -> http::Response<Vec<u8>> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseSink for BufferedResponse {
    fn set_status(&mut self, status: StatusCode) {
        if !self.committed {
            self.status = Some(status);
        }
    }

    fn status(&self) -> Option<StatusCode> {
        self.status
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn commit(&mut self) {
        self.committed = true;
    }

    fn is_committed(&self) -> bool {
        self.committed
    }

    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.body.extend_from_slice(chunk);
        Ok(())
    }
}

/// Output stream handed to body writers.
///
/// Headers stay buffered until the first write, flush or [`finish`](Self::finish)
/// so a writer can still add headers before emitting body bytes. In
/// `discard_body` mode (HEAD) bytes are only counted and the count becomes
/// the `Content-Length` when headers are finally flushed.
pub struct EntityStream<'a> {
    sink: &'a mut dyn ResponseSink,
    headers: HeaderMap,
    headers_flushed: bool,
    discard_body: bool,
    written: u64,
}

impl<'a> EntityStream<'a> {
    pub fn new(sink: &'a mut dyn ResponseSink, headers: HeaderMap, discard_body: bool) -> Self {
        Self {
            sink,
            headers,
            headers_flushed: false,
            discard_body,
            written: 0,
        }
    }

    /// Pending response headers; changes after the first body byte are ignored.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    #[must_use]
    pub fn headers_flushed(&self) -> bool {
        self.headers_flushed
    }

    /// Body bytes written (or counted, when discarding) so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    fn flush_headers(&mut self) {
        if self.headers_flushed {
            return;
        }
        self.headers_flushed = true;
        let pending = std::mem::take(&mut self.headers);
        let target = self.sink.headers_mut();
        let mut last_name = None;
        for (name, value) in pending {
            // `HeaderMap::into_iter` yields `None` names for repeated values.
            if let Some(name) = name {
                target.remove(&name);
                last_name = Some(name);
            }
            if let Some(name) = &last_name {
                target.append(name.clone(), value);
            }
        }
        self.sink.commit();
    }

    /// Flush headers (if still pending) and the transport. Returns the
    /// number of body bytes written or counted.
    pub fn finish(mut self) -> io::Result<u64> {
        if self.discard_body && !self.headers_flushed {
            if let Ok(value) = HeaderValue::from_str(&self.written.to_string()) {
                self.headers.insert(CONTENT_LENGTH, value);
            }
        }
        self.flush_headers();
        self.sink.flush()?;
        debug!(bytes = self.written, discarded = self.discard_body, "Entity stream closed");
        Ok(self.written)
    }
}

impl Write for EntityStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written += buf.len() as u64;
        if self.discard_body {
            return Ok(buf.len());
        }
        self.flush_headers();
        self.sink.write_body(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.discard_body {
            return Ok(());
        }
        self.flush_headers();
        self.sink.flush()
    }
}

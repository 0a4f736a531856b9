// Blocking TCP transport for the upsd line protocol.
//
// One `Connection` owns one socket. Writes are whole newline-terminated
// lines; reads collect lines until a caller-supplied stop condition,
// end-of-stream, or the per-read timeout, whichever comes first. A
// timeout is not an error here: the framer decides whether what was
// collected is a complete response.

use std::fmt;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use secrecy::SecretString;
use tracing::{debug, trace};

use crate::error::Error;

/// IANA-assigned upsd port.
pub const DEFAULT_PORT: u16 = 3493;

/// Default per-read response timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where and how to reach one upsd instance.
///
/// Immutable once handed to a [`NutClient`](crate::NutClient).
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Sent as `USERNAME` right after connecting, when present.
    pub login: Option<String>,
    /// Sent as `PASSWORD` right after `USERNAME`, when present.
    pub password: Option<SecretString>,
    /// Per-read timeout; also bounds connect and write.
    pub timeout: Duration,
    /// Hold one connection for the client's lifetime instead of one per call.
    pub persistent: bool,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            login: None,
            password: None,
            timeout: DEFAULT_TIMEOUT,
            persistent: true,
        }
    }
}

impl Endpoint {
    /// An unauthenticated, persistent endpoint with the default timeout.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, login: impl Into<String>, password: SecretString) -> Self {
        self.login = Some(login.into());
        self.password = Some(password);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// A single open socket to upsd.
pub struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    endpoint: String,
    closed: bool,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Resolve the endpoint and connect to the first address that answers.
    pub fn open(endpoint: &Endpoint) -> Result<Self, Error> {
        let display = endpoint.to_string();
        let transport_err = |source: io::Error| Error::Transport {
            endpoint: display.clone(),
            source,
        };

        let addrs = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(transport_err)?;

        let mut last_error = None;
        for addr in addrs {
            debug!(%addr, "connecting");
            match TcpStream::connect_timeout(&addr, endpoint.timeout) {
                Ok(stream) => {
                    return Self::from_stream(stream, display.clone(), endpoint.timeout)
                        .map_err(transport_err);
                }
                Err(e) => {
                    debug!(%addr, error = %e, "connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(transport_err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses")
        })))
    }

    fn from_stream(stream: TcpStream, endpoint: String, timeout: Duration) -> io::Result<Self> {
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            endpoint,
            closed: false,
        })
    }

    /// `host:port` this connection was opened against.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Write one request line; the newline terminator is appended here.
    pub fn send_line(&mut self, line: &str) -> Result<(), Error> {
        if self.closed {
            return Err(Error::NotConnected {
                endpoint: self.endpoint.clone(),
            });
        }
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        self.writer
            .write_all(&buf)
            .and_then(|()| self.writer.flush())
            .map_err(|source| Error::Transport {
                endpoint: self.endpoint.clone(),
                source,
            })
    }

    /// Read lines until `stop` returns `true` for a line (that line is
    /// included), the peer closes the stream, or a read times out.
    ///
    /// Line terminators are stripped. Bytes that are not valid UTF-8 are
    /// replaced rather than rejected.
    pub fn read_lines(&mut self, mut stop: impl FnMut(&str) -> bool) -> Result<Vec<String>, Error> {
        if self.closed {
            return Err(Error::NotConnected {
                endpoint: self.endpoint.clone(),
            });
        }

        let mut lines = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match self.reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    debug!(collected = lines.len(), "server closed the stream");
                    break;
                }
                Ok(_) => {
                    let complete = buf.ends_with(b"\n");
                    let line = decode_line(&buf);
                    trace!(line = %line, "received");
                    let done = stop(&line);
                    lines.push(line);
                    if done || !complete {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if is_timeout(&e) => {
                    if !buf.is_empty() {
                        lines.push(decode_line(&buf));
                    }
                    debug!(collected = lines.len(), "read timed out");
                    break;
                }
                Err(source) => {
                    return Err(Error::Transport {
                        endpoint: self.endpoint.clone(),
                        source,
                    });
                }
            }
        }
        Ok(lines)
    }

    /// Shut the socket down. Safe to call repeatedly; errors from an
    /// already-dead socket are ignored.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.writer.shutdown(Shutdown::Both) {
            trace!(error = %e, "shutdown on closed socket");
        }
        self.closed = true;
        debug!(endpoint = %self.endpoint, "connection closed");
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn decode_line(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches(['\r', '\n'])
        .to_owned()
}

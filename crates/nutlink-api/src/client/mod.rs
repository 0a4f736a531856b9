// upsd protocol client
//
// Owns the connection lifecycle and runs every request through one
// pipeline: validate against the grammar, send, read until the framer's
// stop condition, frame, extract. Per-command methods (devices, variables,
// instant commands, server info) are inherent methods in the sibling
// modules so this file stays about mechanics.

mod commands;
mod devices;
mod system;
mod variables;


use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{Span, debug, debug_span, warn};

use crate::error::Error;
use crate::extract;
use crate::framer;
use crate::grammar::{CommandLine, Grammar};
use crate::transport::{Connection, Endpoint};

/// Where a client is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClientState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    Busy,
}

/// Synchronous client for one upsd endpoint.
///
/// In persistent mode one connection is opened up front and held until
/// [`close`](Self::close). Otherwise every call opens, authenticates, runs
/// and closes its own connection. The server's HELP listing is fetched on
/// first use and kept for the client's lifetime.
#[derive(Debug)]
pub struct NutClient {
    endpoint: Endpoint,
    grammar: &'static Grammar,
    connection: Option<Connection>,
    server_commands: Option<Vec<String>>,
    state: ClientState,
    span: Span,
    closed: bool,
}

impl NutClient {
    /// Create a client without touching the network.
    pub fn new(endpoint: Endpoint) -> Self {
        let span = debug_span!("nut", host = %endpoint.host, port = endpoint.port);
        Self {
            endpoint,
            grammar: Grammar::standard(),
            connection: None,
            server_commands: None,
            state: ClientState::Disconnected,
            span,
            closed: false,
        }
    }

    /// Create a client and, in persistent mode, connect and authenticate now.
    pub fn connect(endpoint: Endpoint) -> Result<Self, Error> {
        let mut client = Self::new(endpoint);
        client.open()?;
        Ok(client)
    }

    /// Log under `span` instead of the default `nut{host, port}` span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Validate against a grammar other than [`Grammar::standard`].
    pub fn with_grammar(mut self, grammar: &'static Grammar) -> Self {
        self.grammar = grammar;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The server's HELP listing, once it has been fetched.
    pub fn server_commands(&self) -> Option<&[String]> {
        self.server_commands.as_deref()
    }

    /// Open the persistent connection if it is not open yet.
    ///
    /// A no-op in non-persistent mode, where connections are per call.
    pub fn open(&mut self) -> Result<(), Error> {
        self.ensure_usable()?;
        if !self.endpoint.persistent {
            return Ok(());
        }
        let span = self.span.clone();
        let _enter = span.enter();
        self.ensure_connected()
    }

    /// Send `LOGOUT` (best effort) and release the socket.
    ///
    /// Idempotent. Also runs on drop. After this every call fails with
    /// [`Error::NotConnected`].
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        let span = self.span.clone();
        let _enter = span.enter();
        self.disconnect();
        self.closed = true;
        debug!("client closed");
    }

    /// Run a raw request line and return its framed payload lines.
    ///
    /// The line is parsed and validated like any other request; nothing
    /// outside the grammar reaches the wire.
    pub fn request(&mut self, raw: &str) -> Result<Vec<String>, Error> {
        let line = CommandLine::parse(raw)?;
        self.execute(&line, |_, payload| Ok(payload))
    }

    // ── Pipeline ─────────────────────────────────────────────────────

    /// Validate, send, frame and hand the payload to `extract`.
    pub(crate) fn execute<T>(
        &mut self,
        line: &CommandLine,
        extract: impl FnOnce(&CommandLine, Vec<String>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.ensure_usable()?;
        let span = self.span.clone();
        let _enter = span.enter();

        match self.server_commands.as_deref() {
            Some(server) => self.grammar.validate(line, Some(server))?,
            // Shape errors for commands this client knows are caught before
            // any connection is made, even before the listing is fetched.
            None if self.grammar.command(&line.main).is_some() => {
                self.grammar.validate(line, None)?;
            }
            None => {}
        }

        let payload = self.call(line)?;
        extract(line, payload)
    }

    fn call(&mut self, line: &CommandLine) -> Result<Vec<String>, Error> {
        self.ensure_connected()?;
        self.state = ClientState::Busy;
        let result = self.exchange(line);
        self.state = ClientState::Ready;

        match &result {
            Err(e) if e.desynchronizes_stream() => {
                debug!(error = %e, "dropping connection after failed exchange");
                self.drop_connection();
            }
            _ if !self.endpoint.persistent => self.disconnect(),
            _ => {}
        }
        result
    }

    fn exchange(&mut self, line: &CommandLine) -> Result<Vec<String>, Error> {
        self.negotiate()?;
        self.grammar
            .validate(line, self.server_commands.as_deref())?;
        let conn = self.connection_mut()?;
        round_trip(conn, line)
    }

    /// Fetch the HELP listing once per client.
    fn negotiate(&mut self) -> Result<(), Error> {
        if self.server_commands.is_some() {
            return Ok(());
        }
        let help = CommandLine::new("HELP");
        self.grammar.validate(&help, None)?;
        let conn = self.connection_mut()?;
        let reply = round_trip(conn, &help)?;
        let commands = reply
            .first()
            .map(|line| extract::help_commands(line))
            .unwrap_or_default();
        debug!(?commands, "server command listing");
        self.server_commands = Some(commands);
        Ok(())
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    fn ensure_usable(&self) -> Result<(), Error> {
        if self.closed {
            Err(Error::NotConnected {
                endpoint: self.endpoint.to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn connection_mut(&mut self) -> Result<&mut Connection, Error> {
        let endpoint = &self.endpoint;
        self.connection
            .as_mut()
            .ok_or_else(|| Error::NotConnected {
                endpoint: endpoint.to_string(),
            })
    }

    fn ensure_connected(&mut self) -> Result<(), Error> {
        if self.connection.is_some() {
            return Ok(());
        }

        self.state = ClientState::Connecting;
        let mut conn = match Connection::open(&self.endpoint) {
            Ok(conn) => conn,
            Err(e) => {
                self.state = ClientState::Disconnected;
                return Err(e);
            }
        };
        debug!("connected");

        if self.endpoint.login.is_some() || self.endpoint.password.is_some() {
            self.state = ClientState::Authenticating;
            if let Err(e) = self.authenticate(&mut conn) {
                conn.close();
                self.state = ClientState::Disconnected;
                return Err(e);
            }
            debug!("authenticated");
        }

        self.connection = Some(conn);
        self.state = ClientState::Ready;
        Ok(())
    }

    fn authenticate(&self, conn: &mut Connection) -> Result<(), Error> {
        if let Some(login) = &self.endpoint.login {
            self.send_credential(conn, "USERNAME", "username", login)?;
        }
        if let Some(password) = &self.endpoint.password {
            self.send_credential(conn, "PASSWORD", "password", password.expose_secret())?;
        }
        Ok(())
    }

    /// Send one credential; anything but a bare `OK` fails authentication.
    fn send_credential(
        &self,
        conn: &mut Connection,
        step: &'static str,
        argument: &'static str,
        value: &str,
    ) -> Result<(), Error> {
        let line = CommandLine::new(step).arg(argument, value)?;
        self.grammar.validate(&line, None)?;
        debug!(request = %line.redacted(), "sending");
        conn.send_line(&line.wire())?;
        let raw = conn.read_lines(framer::stop_condition(&line))?;
        let reply = raw
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
            .unwrap_or_default();
        if reply == "OK" {
            Ok(())
        } else {
            Err(Error::AuthenticationFailed {
                step,
                reply: reply.to_owned(),
            })
        }
    }

    /// Best-effort `LOGOUT`, then close.
    fn disconnect(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            if let Err(e) = conn.send_line("LOGOUT") {
                warn!(error = %e, "LOGOUT failed during teardown");
            }
            conn.close();
        }
        self.state = ClientState::Disconnected;
    }

    /// Close a connection that failed mid-call, without the LOGOUT.
    fn drop_connection(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            conn.close();
        }
        self.state = ClientState::Disconnected;
    }
}

impl Drop for NutClient {
    fn drop(&mut self) {
        self.close();
    }
}

fn round_trip(conn: &mut Connection, line: &CommandLine) -> Result<Vec<String>, Error> {
    debug!(request = %line.redacted(), "sending");
    conn.send_line(&line.wire())?;
    let raw = conn.read_lines(framer::stop_condition(line))?;
    framer::frame(line, &raw)
}

/// First payload line of a single-line reply.
fn first_line(payload: &[String]) -> &str {
    payload.first().map_or("", String::as_str)
}

//! Scripted in-process upsd for tests.
//!
//! [`MockServer`] listens on an ephemeral localhost port, serves one
//! connection at a time, records every request line, and answers with
//! whatever its handler returns. [`standard_reply`] is a ready-made handler
//! describing two devices.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::transport::Endpoint;

type Handler = dyn Fn(&str) -> Option<String> + Send + Sync;

/// A fake upsd that answers from a handler function.
///
/// The handler receives one request line (without the newline) and returns
/// the raw reply text, or `None` to stay silent. `LOGOUT` is answered and
/// ends the connection without reaching the handler.
pub struct MockServer {
    port: u16,
    requests: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MockServer {
    pub fn spawn(
        handler: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0))?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();

        let requests = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let handler: Arc<Handler> = Arc::new(handler);
        let state = Shared {
            requests: Arc::clone(&requests),
            connections: Arc::clone(&connections),
            stop: Arc::clone(&stop),
            handler,
        };
        let handle = thread::spawn(move || state.accept_loop(&listener));

        Ok(Self {
            port,
            requests,
            connections,
            stop,
            handle: Some(handle),
        })
    }

    /// A server answering from [`standard_reply`].
    pub fn standard() -> io::Result<Self> {
        Self::spawn(standard_reply)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Persistent, unauthenticated endpoint with a short read timeout.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new("127.0.0.1", self.port).with_timeout(Duration::from_millis(500))
    }

    /// Every request line received so far, across all connections.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct Shared {
    requests: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
    handler: Arc<Handler>,
}

impl Shared {
    fn accept_loop(&self, listener: &TcpListener) {
        while !self.stop.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, _)) => {
                    self.connections.fetch_add(1, Ordering::SeqCst);
                    if let Err(e) = self.serve(stream) {
                        debug!(error = %e, "mock connection ended with an error");
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(5));
                }
                Err(_) => return,
            }
        }
    }

    fn serve(&self, stream: TcpStream) -> io::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(Duration::from_millis(50)))?;
        let mut writer = stream.try_clone()?;
        let mut reader = BufReader::new(stream);
        let mut line = String::new();

        loop {
            match reader.read_line(&mut line) {
                Ok(0) => return Ok(()),
                Ok(_) => {
                    let request = line.trim_end_matches(['\r', '\n']).to_owned();
                    line.clear();
                    if self.answer(&mut writer, request)? {
                        return Ok(());
                    }
                }
                Err(e) if is_timeout(&e) => {
                    if self.stop.load(Ordering::SeqCst) {
                        return Ok(());
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Record and answer one request; `true` ends the connection.
    fn answer(&self, writer: &mut TcpStream, request: String) -> io::Result<bool> {
        let reply = if request == "LOGOUT" {
            Some("OK Goodbye\n".to_owned())
        } else {
            (self.handler)(&request)
        };
        let logout = request == "LOGOUT";
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        if let Some(mut reply) = reply {
            if !reply.ends_with('\n') {
                reply.push('\n');
            }
            writer.write_all(reply.as_bytes())?;
            writer.flush()?;
        }
        Ok(logout)
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Wrap `lines` in a `BEGIN <request>` / `END <request>` block.
pub fn block(request: &str, lines: &[String]) -> String {
    let mut out = format!("BEGIN {request}\n");
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&format!("END {request}\n"));
    out
}

struct MockDevice {
    name: &'static str,
    description: &'static str,
    vars: &'static [(&'static str, &'static str)],
    rw: &'static [&'static str],
    commands: &'static [&'static str],
    logins: u32,
    clients: &'static [&'static str],
}

const DEVICES: &[MockDevice] = &[
    MockDevice {
        name: "ups1",
        description: "Test UPS",
        vars: &[
            ("battery.charge", "100"),
            ("ups.status", "OL CHRG"),
            ("input.transfer.low", "100"),
            ("ups.id", "rack one"),
        ],
        rw: &["input.transfer.low", "ups.id"],
        commands: &["beeper.off", "test.battery.start"],
        logins: 3,
        clients: &["127.0.0.1", "10.0.0.9"],
    },
    MockDevice {
        name: "ups2",
        description: "Backup UPS",
        vars: &[("battery.charge", "80"), ("ups.status", "OB")],
        rw: &[],
        commands: &[],
        logins: 0,
        clients: &[],
    },
];

/// Valid credentials for [`standard_reply`].
pub const USERNAME: &str = "monitor";
pub const PASSWORD: &str = "secret";

/// Handler describing `ups1` (writable variables, instant commands, three
/// logins) and `ups2` (read-only, idle).
pub fn standard_reply(request: &str) -> Option<String> {
    let words: Vec<&str> = request.split_whitespace().collect();
    let reply = match words.as_slice() {
        ["HELP"] => {
            "Commands: HELP VER GET LIST SET INSTCMD LOGIN LOGOUT USERNAME PASSWORD STARTTLS\n"
                .to_owned()
        }
        ["VER"] => "Network UPS Tools upsd 2.8.1 - https://www.networkupstools.org/\n".to_owned(),
        ["PROTVER"] => "1.3\n".to_owned(),
        ["USERNAME", _] => "OK\n".to_owned(),
        ["PASSWORD", pw] if *pw == PASSWORD => "OK\n".to_owned(),
        ["PASSWORD", _] => "ERR ACCESS-DENIED\n".to_owned(),
        ["LIST", "UPS"] => block(
            request,
            &DEVICES
                .iter()
                .map(|d| format!("UPS {} \"{}\"", d.name, d.description))
                .collect::<Vec<_>>(),
        ),
        ["LIST", "CLIENTS"] => block(
            request,
            &DEVICES
                .iter()
                .flat_map(|d| d.clients.iter().map(|c| format!("CLIENT {c} {}", d.name)))
                .collect::<Vec<_>>(),
        ),
        ["LIST", sub, dev, rest @ ..] => match find(dev) {
            Some(device) => list(request, device, sub, rest),
            None => "ERR UNKNOWN-UPS\n".to_owned(),
        },
        ["GET", sub, dev, rest @ ..] => match find(dev) {
            Some(device) => get(device, sub, rest),
            None => "ERR UNKNOWN-UPS\n".to_owned(),
        },
        ["SET", "VAR", dev, var, _value @ ..] => match find(dev) {
            Some(device) if device.rw.contains(var) => "OK\n".to_owned(),
            Some(device) if device.vars.iter().any(|(n, _)| n == var) => {
                "ERR READONLY\n".to_owned()
            }
            Some(_) => "ERR VAR-NOT-SUPPORTED\n".to_owned(),
            None => "ERR UNKNOWN-UPS\n".to_owned(),
        },
        ["INSTCMD", dev, cmd] => match find(dev) {
            Some(device) if device.commands.contains(cmd) => "OK\n".to_owned(),
            Some(_) => "ERR CMD-NOT-SUPPORTED\n".to_owned(),
            None => "ERR UNKNOWN-UPS\n".to_owned(),
        },
        _ => "ERR UNKNOWN-COMMAND\n".to_owned(),
    };
    Some(reply)
}

fn find(name: &str) -> Option<&'static MockDevice> {
    DEVICES.iter().find(|d| d.name == name)
}

fn var_value(device: &MockDevice, var: &str) -> Option<&'static str> {
    device.vars.iter().find(|(n, _)| *n == var).map(|(_, v)| *v)
}

fn list(request: &str, device: &MockDevice, sub: &str, rest: &[&str]) -> String {
    let name = device.name;
    let lines: Vec<String> = match (sub, rest) {
        ("VAR", []) => device
            .vars
            .iter()
            .map(|(n, v)| format!("VAR {name} {n} \"{v}\""))
            .collect(),
        ("RW", []) => device
            .rw
            .iter()
            .filter_map(|n| var_value(device, n).map(|v| format!("RW {name} {n} \"{v}\"")))
            .collect(),
        ("CMD", []) => device
            .commands
            .iter()
            .map(|c| format!("CMD {name} {c}"))
            .collect(),
        ("CLIENTS", []) => device
            .clients
            .iter()
            .map(|c| format!("CLIENT {c} {name}"))
            .collect(),
        ("ENUM", ["input.transfer.low"]) if name == "ups1" => ["97", "100", "103"]
            .iter()
            .map(|v| format!("ENUM {name} input.transfer.low \"{v}\""))
            .collect(),
        ("RANGE", ["input.transfer.low"]) if name == "ups1" => {
            vec![format!("RANGE {name} input.transfer.low \"90\" \"105\"")]
        }
        _ => return "ERR INVALID-ARGUMENT\n".to_owned(),
    };
    block(request, &lines)
}

fn get(device: &MockDevice, sub: &str, rest: &[&str]) -> String {
    let name = device.name;
    match (sub, rest) {
        ("UPSDESC", []) => format!("UPSDESC {name} \"{}\"\n", device.description),
        ("NUMLOGINS", []) => format!("NUMLOGINS {name} {}\n", device.logins),
        ("VAR", [var]) => match var_value(device, var) {
            Some(value) => format!("VAR {name} {var} \"{value}\"\n"),
            None => "ERR VAR-NOT-SUPPORTED\n".to_owned(),
        },
        ("DESC", [var]) => format!("DESC {name} {var} \"Description of {var}\"\n"),
        ("TYPE", [var]) => {
            let ty = match *var {
                "input.transfer.low" => "RW ENUM",
                "ups.id" => "RW STRING:32",
                "ups.status" => "STRING:16",
                _ => "NUMBER",
            };
            format!("TYPE {name} {var} {ty}\n")
        }
        ("CMDDESC", [cmd]) if device.commands.contains(cmd) => {
            format!("CMDDESC {name} {cmd} \"Run {cmd}\"\n")
        }
        ("CMDDESC", [_]) => "ERR CMD-NOT-SUPPORTED\n".to_owned(),
        _ => "ERR INVALID-ARGUMENT\n".to_owned(),
    }
}

// Instant commands.

use super::{NutClient, first_line};
use crate::error::Error;
use crate::extract;
use crate::grammar::CommandLine;

impl NutClient {
    /// `LIST CMD <device>`: instant command names.
    pub fn list_commands(&mut self, device: &str) -> Result<Vec<String>, Error> {
        let line = CommandLine::new("LIST").sub("CMD").arg("device", device)?;
        self.execute(&line, |req, payload| extract::names(req, &payload))
    }

    /// `GET CMDDESC <device> <command>`.
    pub fn command_description(&mut self, device: &str, command: &str) -> Result<String, Error> {
        let line = CommandLine::new("GET")
            .sub("CMDDESC")
            .arg("device", device)?
            .arg("command", command)?;
        self.execute(&line, |req, payload| {
            extract::single_value(req, first_line(&payload))
        })
    }

    /// `INSTCMD <device> <command>`. The server must answer a bare `OK`.
    pub fn run_command(&mut self, device: &str, command: &str) -> Result<(), Error> {
        let line = CommandLine::new("INSTCMD")
            .arg("device", device)?
            .arg("command", command)?;
        self.execute(&line, |req, payload| {
            extract::expect_ok(req, first_line(&payload))
        })
    }
}

// Server-level requests.

use super::{NutClient, first_line};
use crate::error::Error;
use crate::extract;
use crate::grammar::CommandLine;

impl NutClient {
    /// `HELP`: the command words the server advertises.
    pub fn help(&mut self) -> Result<Vec<String>, Error> {
        self.execute(&CommandLine::new("HELP"), |_, payload| {
            Ok(extract::help_commands(first_line(&payload)))
        })
    }

    /// `VER`: the server's version banner, verbatim.
    pub fn version(&mut self) -> Result<String, Error> {
        self.execute(&CommandLine::new("VER"), |_, payload| {
            Ok(first_line(&payload).to_owned())
        })
    }

    /// `PROTVER`: the network protocol version, verbatim.
    pub fn protocol_version(&mut self) -> Result<String, Error> {
        self.execute(&CommandLine::new("PROTVER"), |_, payload| {
            Ok(first_line(&payload).to_owned())
        })
    }
}

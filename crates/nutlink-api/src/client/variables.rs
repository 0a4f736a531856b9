// Variable requests: listings, single reads, metadata and writes.

use super::{NutClient, first_line};
use crate::error::Error;
use crate::extract;
use crate::grammar::CommandLine;
use crate::models::{Listing, VarType};

impl NutClient {
    /// `LIST VAR <device>`: every variable and its current value.
    pub fn list_vars(&mut self, device: &str) -> Result<Listing, Error> {
        let line = CommandLine::new("LIST").sub("VAR").arg("device", device)?;
        self.execute(&line, |req, payload| extract::key_values(req, &payload))
    }

    /// `LIST RW <device>`: the writable subset.
    pub fn list_rw_vars(&mut self, device: &str) -> Result<Listing, Error> {
        let line = CommandLine::new("LIST").sub("RW").arg("device", device)?;
        self.execute(&line, |req, payload| extract::key_values(req, &payload))
    }

    /// `LIST ENUM <device> <var>`: values an enumerated variable accepts.
    pub fn list_enum(&mut self, device: &str, var: &str) -> Result<Vec<String>, Error> {
        let line = var_line("LIST", "ENUM", device, var)?;
        self.execute(&line, |req, payload| extract::quoted_values(req, &payload))
    }

    /// `LIST RANGE <device> <var>`: `(min, max)` pairs a ranged variable accepts.
    pub fn list_range(
        &mut self,
        device: &str,
        var: &str,
    ) -> Result<Vec<(String, String)>, Error> {
        let line = var_line("LIST", "RANGE", device, var)?;
        self.execute(&line, |req, payload| extract::ranges(req, &payload))
    }

    /// `GET VAR <device> <var>`.
    pub fn get_var(&mut self, device: &str, var: &str) -> Result<String, Error> {
        let line = var_line("GET", "VAR", device, var)?;
        self.execute(&line, |req, payload| {
            extract::single_value(req, first_line(&payload))
        })
    }

    /// `GET DESC <device> <var>`.
    pub fn var_description(&mut self, device: &str, var: &str) -> Result<String, Error> {
        let line = var_line("GET", "DESC", device, var)?;
        self.execute(&line, |req, payload| {
            extract::single_value(req, first_line(&payload))
        })
    }

    /// `GET TYPE <device> <var>`.
    pub fn var_type(&mut self, device: &str, var: &str) -> Result<VarType, Error> {
        let line = var_line("GET", "TYPE", device, var)?;
        self.execute(&line, |req, payload| {
            extract::var_type(req, first_line(&payload))
        })
    }

    /// `SET VAR <device> <var> <value>`. The server must answer a bare `OK`.
    pub fn set_var(&mut self, device: &str, var: &str, value: &str) -> Result<(), Error> {
        let line = var_line("SET", "VAR", device, var)?.arg("value", value)?;
        self.execute(&line, |req, payload| {
            extract::expect_ok(req, first_line(&payload))
        })
    }
}

fn var_line(
    main: &str,
    sub: &str,
    device: &str,
    var: &str,
) -> Result<CommandLine, Error> {
    CommandLine::new(main)
        .sub(sub)
        .arg("device", device)?
        .arg("variable", var)
}

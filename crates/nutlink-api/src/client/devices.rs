// Device-level requests: listing, descriptions, logins, attached clients.

use super::{NutClient, first_line};
use crate::error::Error;
use crate::extract;
use crate::grammar::CommandLine;
use crate::models::{ClientList, Listing};

impl NutClient {
    /// `LIST UPS`: device name to description, in server order.
    pub fn list_devices(&mut self) -> Result<Listing, Error> {
        let line = CommandLine::new("LIST").sub("UPS");
        self.execute(&line, |req, payload| extract::key_values(req, &payload))
    }

    /// `GET UPSDESC <device>`.
    pub fn device_description(&mut self, device: &str) -> Result<String, Error> {
        let line = CommandLine::new("GET")
            .sub("UPSDESC")
            .arg("device", device)?;
        self.execute(&line, |req, payload| {
            extract::single_value(req, first_line(&payload))
        })
    }

    /// `GET NUMLOGINS <device>`: how many clients are logged in to it.
    pub fn num_logins(&mut self, device: &str) -> Result<u64, Error> {
        let line = CommandLine::new("GET")
            .sub("NUMLOGINS")
            .arg("device", device)?;
        self.execute(&line, |req, payload| {
            extract::single_number(req, first_line(&payload))
        })
    }

    /// `LIST CLIENTS [<device>]`: client hosts grouped by device.
    pub fn list_clients(&mut self, device: Option<&str>) -> Result<ClientList, Error> {
        let mut line = CommandLine::new("LIST").sub("CLIENTS");
        if let Some(device) = device {
            line = line.arg("device", device)?;
        }
        self.execute(&line, |req, payload| extract::clients(req, &payload))
    }
}

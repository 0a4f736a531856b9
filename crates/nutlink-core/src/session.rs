// ── Session ──
//
// One logical relationship with one upsd: owns the protocol client, builds
// the device inventory, refreshes it in place, and tears everything down
// exactly once. Every public operation runs on the caller's thread and
// blocks until its reply is framed or the read timeout expires.

use indexmap::IndexMap;
use nutlink_api::{ClientList, ErrorStage, Listing, NutClient, VarType};
use tracing::{Span, debug, info};

use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::model::Device;
use crate::model::device::{merge_variables, refresh_variables};

/// Lifecycle state of a session's connection.
pub use nutlink_api::ClientState as SessionState;

/// A session with one upsd instance.
#[derive(Debug)]
pub struct Session {
    client: NutClient,
    fetch_descriptions: bool,
    devices: IndexMap<String, Device>,
    closed: bool,
}

impl Session {
    /// Connect (persistent mode), authenticate, and build the inventory if
    /// the config asks for it.
    pub fn open(config: SessionConfig) -> Result<Self, CoreError> {
        Self::open_with_span(config, None)
    }

    /// Like [`open`](Self::open), logging under `span` instead of the
    /// client's default span.
    pub fn open_with_span(config: SessionConfig, span: Option<Span>) -> Result<Self, CoreError> {
        let mut client = NutClient::new(config.endpoint);
        if let Some(span) = span {
            client = client.with_span(span);
        }
        client.open()?;

        let mut session = Self {
            client,
            fetch_descriptions: config.fetch_descriptions,
            devices: IndexMap::new(),
            closed: false,
        };
        if config.build_inventory {
            session.build_inventory()?;
        }
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.client.state()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The underlying protocol client, for requests the session does not wrap.
    pub fn client(&mut self) -> Result<&mut NutClient, CoreError> {
        self.ensure_open()?;
        Ok(&mut self.client)
    }

    // ── Inventory ────────────────────────────────────────────────────

    /// Known devices, in `LIST UPS` order.
    pub fn devices(&self) -> &IndexMap<String, Device> {
        &self.devices
    }

    pub fn device(&self, name: &str) -> Result<&Device, CoreError> {
        self.devices
            .get(name)
            .ok_or_else(|| CoreError::DeviceNotFound {
                name: name.to_owned(),
            })
    }

    /// List devices, then for each fetch commands, variables and writable
    /// variables (and descriptions if configured). Nothing is committed
    /// unless every device builds.
    pub fn build_inventory(&mut self) -> Result<(), CoreError> {
        self.ensure_open()?;
        let listing = self.client.list_devices()?;

        let mut devices = IndexMap::with_capacity(listing.len());
        for (name, description) in listing {
            let device = self.build_device(name.clone(), description)?;
            devices.insert(name, device);
        }

        info!(devices = devices.len(), "inventory built");
        self.devices = devices;
        Ok(())
    }

    fn build_device(&mut self, name: String, description: String) -> Result<Device, CoreError> {
        let command_names = self.client.list_commands(&name)?;
        let vars = self.client.list_vars(&name)?;
        let rw = self.client.list_rw_vars(&name)?;

        let mut device = Device::new(name, description);
        device.variables = merge_variables(vars, rw);

        let mut commands = IndexMap::with_capacity(command_names.len());
        for command in command_names {
            let description = if self.fetch_descriptions {
                optional(self.client.command_description(&device.name, &command))?
            } else {
                None
            };
            let description = description.unwrap_or_else(|| command.clone());
            commands.insert(command, description);
        }
        device.commands = commands;

        if self.fetch_descriptions {
            self.describe_variables(&mut device)?;
        }

        device.stamp();
        debug!(
            device = %device.name,
            variables = device.variables.len(),
            commands = device.commands.len(),
            "device built"
        );
        Ok(device)
    }

    fn describe_variables(&mut self, device: &mut Device) -> Result<(), CoreError> {
        for (name, variable) in &mut device.variables {
            variable.description = optional(self.client.var_description(&device.name, name))?;
        }
        Ok(())
    }

    /// Re-read one device's variable values (`LIST VAR` only) and restamp
    /// it. The device is left untouched if the read fails.
    pub fn update(&mut self, name: &str) -> Result<&Device, CoreError> {
        self.ensure_open()?;
        let previous = self.device(name)?.variables.clone();
        let fresh = self.client.list_vars(name)?;

        let mut variables = refresh_variables(&previous, fresh);
        if self.fetch_descriptions {
            for (var, variable) in &mut variables {
                if variable.description.is_none() && !previous.contains_key(var) {
                    variable.description = optional(self.client.var_description(name, var))?;
                }
            }
        }

        let device = self
            .devices
            .get_mut(name)
            .ok_or_else(|| CoreError::DeviceNotFound {
                name: name.to_owned(),
            })?;
        device.variables = variables;
        device.stamp();
        debug!(device = %name, "device refreshed");
        Ok(&*device)
    }

    /// [`update`](Self::update) every known device, stopping at the first failure.
    pub fn update_all(&mut self) -> Result<(), CoreError> {
        let names: Vec<String> = self.devices.keys().cloned().collect();
        for name in names {
            self.update(&name)?;
        }
        Ok(())
    }

    // ── Direct operations ────────────────────────────────────────────

    pub fn list_devices(&mut self) -> Result<Listing, CoreError> {
        Ok(self.client()?.list_devices()?)
    }

    pub fn list_variables(&mut self, device: &str) -> Result<Listing, CoreError> {
        Ok(self.client()?.list_vars(device)?)
    }

    pub fn list_rw_variables(&mut self, device: &str) -> Result<Listing, CoreError> {
        Ok(self.client()?.list_rw_vars(device)?)
    }

    pub fn list_commands(&mut self, device: &str) -> Result<Vec<String>, CoreError> {
        Ok(self.client()?.list_commands(device)?)
    }

    pub fn list_enum(&mut self, device: &str, var: &str) -> Result<Vec<String>, CoreError> {
        Ok(self.client()?.list_enum(device, var)?)
    }

    pub fn list_range(
        &mut self,
        device: &str,
        var: &str,
    ) -> Result<Vec<(String, String)>, CoreError> {
        Ok(self.client()?.list_range(device, var)?)
    }

    pub fn list_clients(&mut self, device: Option<&str>) -> Result<ClientList, CoreError> {
        Ok(self.client()?.list_clients(device)?)
    }

    pub fn num_logins(&mut self, device: &str) -> Result<u64, CoreError> {
        Ok(self.client()?.num_logins(device)?)
    }

    pub fn get_variable(&mut self, device: &str, var: &str) -> Result<String, CoreError> {
        Ok(self.client()?.get_var(device, var)?)
    }

    pub fn variable_type(&mut self, device: &str, var: &str) -> Result<VarType, CoreError> {
        Ok(self.client()?.var_type(device, var)?)
    }

    /// Write a variable. The cached inventory is not touched; call
    /// [`update`](Self::update) to see the new value.
    pub fn set_variable(&mut self, device: &str, var: &str, value: &str) -> Result<(), CoreError> {
        Ok(self.client()?.set_var(device, var, value)?)
    }

    pub fn run_command(&mut self, device: &str, command: &str) -> Result<(), CoreError> {
        Ok(self.client()?.run_command(device, command)?)
    }

    pub fn version(&mut self) -> Result<String, CoreError> {
        Ok(self.client()?.version()?)
    }

    pub fn protocol_version(&mut self) -> Result<String, CoreError> {
        Ok(self.client()?.protocol_version()?)
    }

    pub fn help(&mut self) -> Result<Vec<String>, CoreError> {
        Ok(self.client()?.help()?)
    }

    // ── Teardown ─────────────────────────────────────────────────────

    /// Log out and close the connection. Idempotent; also runs on drop.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.client.close();
        self.closed = true;
    }

    fn ensure_open(&self) -> Result<(), CoreError> {
        if self.closed {
            Err(CoreError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// Turn a failed description fetch into `None`. Only transport-level and
/// local failures propagate; the server refusing or garbling one
/// description does not abort the inventory.
fn optional<T>(result: Result<T, nutlink_api::Error>) -> Result<Option<T>, CoreError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if matches!(
            e.stage(),
            ErrorStage::Server | ErrorStage::Extraction | ErrorStage::Framing
        ) =>
        {
            debug!(error = %e, "description unavailable");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

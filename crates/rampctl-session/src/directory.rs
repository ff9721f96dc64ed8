//! Device directory: resolves paired-device names to addresses.
//!
//! Discovery and pairing happen outside rampctl (in the operating
//! system's Bluetooth settings, for example). The session layer only
//! needs two answers from that world: which devices can we dial, and what
//! is our own radio's address. [`DeviceDirectory`] is that seam.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::SessionError;

/// One device known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Human-readable name shown in pickers.
    pub name: String,
    /// Address the transport dials or binds.
    pub address: String,
    /// Free-form description (device class, driver, …).
    #[serde(default)]
    pub description: String,
}

impl DeviceInfo {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            description: String::new(),
        }
    }
}

/// Source of paired devices and of the local adapter's identity.
pub trait DeviceDirectory: Send + Sync + 'static {
    /// All devices this machine is paired with.
    fn paired_devices(
        &self,
    ) -> impl Future<Output = Result<Vec<DeviceInfo>, SessionError>> + Send;

    /// This machine's own adapter, if it has one.
    fn local_adapter(
        &self,
    ) -> impl Future<Output = Result<Option<DeviceInfo>, SessionError>> + Send;
}

/// A directory backed by a fixed table, e.g. loaded from a config file.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    local: Option<DeviceInfo>,
    paired: Vec<DeviceInfo>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local_adapter(mut self, adapter: DeviceInfo) -> Self {
        self.local = Some(adapter);
        self
    }

    pub fn with_paired(mut self, device: DeviceInfo) -> Self {
        self.paired.push(device);
        self
    }
}

impl DeviceDirectory for StaticDirectory {
    async fn paired_devices(&self) -> Result<Vec<DeviceInfo>, SessionError> {
        Ok(self.paired.clone())
    }

    async fn local_adapter(&self) -> Result<Option<DeviceInfo>, SessionError> {
        Ok(self.local.clone())
    }
}

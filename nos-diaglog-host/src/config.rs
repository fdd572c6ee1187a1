//! Host runtime configuration

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use nos_diaglog::{DEFAULT_DRAIN_SLOTS, DiagConfig, DiagError};

/// Telnet port the firmware listens on
pub const DEFAULT_TCP_PORT: u16 = 23;

/// Slots left over once the sentinel and console drains are registered
pub const DEFAULT_MAX_CLIENTS: usize = DEFAULT_DRAIN_SLOTS - 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    pub diag: DiagConfig,
    /// Register the stdout console drain at start-up
    pub with_console: bool,
    pub listen_addr: SocketAddr,
    /// Connected TCP clients beyond this are turned away
    pub max_clients: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            diag: DiagConfig::default(),
            with_console: true,
            listen_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_TCP_PORT)),
            max_clients: DEFAULT_MAX_CLIENTS,
        }
    }
}

impl HostConfig {
    pub fn with_diag(mut self, diag: DiagConfig) -> Self {
        self.diag = diag;
        self
    }

    pub fn with_console(mut self, enabled: bool) -> Self {
        self.with_console = enabled;
        self
    }

    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    pub fn validate(&self) -> Result<(), DiagError> {
        self.diag.validate()?;
        if self.max_clients == 0 {
            return Err(DiagError::InvalidConfig("at least one TCP client must be allowed"));
        }
        Ok(())
    }
}

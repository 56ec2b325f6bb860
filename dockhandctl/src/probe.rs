//! Network-level readiness signal: a container can be scheduled and
//! reported running before its listening socket is bound, so the
//! orchestrator additionally probes the published port.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

pub trait NetworkProbe: Send + Sync {
    /// One TCP connection attempt; true when the port accepts.
    fn is_open(&self) -> bool;
}

pub struct TcpProbe {
    host: String,
    port: u16,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl NetworkProbe for TcpProbe {
    fn is_open(&self) -> bool {
        let addrs = match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(err) => {
                debug!("Failed to resolve {}:{}: {}", self.host, self.port, err);
                return false;
            }
        };

        for addr in addrs {
            if TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).is_ok() {
                return true;
            }
        }

        false
    }
}

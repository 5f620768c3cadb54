use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BusError;

/// Transport layer for ZeroMQ connections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "address")]
pub enum Transport {
    /// Unix domain socket at the given filesystem path.
    Ipc(String),

    /// TCP transport for distributed deployment.
    Tcp { host: String, port: u16 },
}

impl Transport {
    /// Create an IPC transport under `/tmp/tmplsync/`.
    pub fn ipc(name: &str) -> Self {
        Self::Ipc(format!("/tmp/tmplsync/{name}.sock"))
    }

    /// Create a TCP transport with the given host and port.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Parse a configured endpoint such as `tcp://127.0.0.1:5555` or
    /// `ipc:///tmp/tmplsync/bus.sock`.
    pub fn parse(endpoint: &str) -> Result<Self, BusError> {
        if let Some(path) = endpoint.strip_prefix("ipc://") {
            if path.is_empty() {
                return Err(BusError::InvalidEndpoint(endpoint.to_string()));
            }
            return Ok(Self::Ipc(path.to_string()));
        }

        let addr = endpoint
            .strip_prefix("tcp://")
            .ok_or_else(|| BusError::InvalidEndpoint(endpoint.to_string()))?;
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| BusError::InvalidEndpoint(endpoint.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| BusError::InvalidEndpoint(endpoint.to_string()))?;
        if host.is_empty() {
            return Err(BusError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(Self::tcp(host, port))
    }

    /// Generate the ZeroMQ endpoint address string.
    pub fn endpoint(&self) -> String {
        match self {
            Self::Ipc(path) => format!("ipc://{path}"),
            Self::Tcp { host, port } => format!("tcp://{host}:{port}"),
        }
    }

    /// For IPC transports, ensure the parent directory exists.
    ///
    /// ZeroMQ requires the directory to exist before binding an IPC socket.
    /// This is a no-op for TCP transports.
    pub fn ensure_ipc_dir(&self) -> std::io::Result<()> {
        if let Self::Ipc(path) = self {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Remove a stale IPC socket file left over from a previous run.
    ///
    /// No-op for TCP transports or if the file doesn't exist.
    pub fn remove_stale_socket(&self) -> std::io::Result<()> {
        if let Self::Ipc(path) = self {
            match std::fs::remove_file(path) {
                Ok(()) => {
                    tracing::debug!(path = %path, "removed stale IPC socket");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipc_endpoint() {
        let t = Transport::ipc("bus");
        assert_eq!(t.endpoint(), "ipc:///tmp/tmplsync/bus.sock");
    }

    #[test]
    fn tcp_endpoint() {
        let t = Transport::tcp("127.0.0.1", 5555);
        assert_eq!(t.endpoint(), "tcp://127.0.0.1:5555");
    }

    #[test]
    fn parse_roundtrips_endpoint() {
        for endpoint in ["tcp://127.0.0.1:5555", "tcp://broker.internal:6000", "ipc:///tmp/tmplsync/bus.sock"] {
            assert_eq!(Transport::parse(endpoint).unwrap().endpoint(), endpoint);
        }
    }

    #[test]
    fn parse_rejects_malformed_endpoints() {
        for endpoint in ["127.0.0.1:5555", "tcp://127.0.0.1", "tcp://:5555", "tcp://host:notaport", "ipc://", "amqp://guest@localhost"] {
            assert!(
                matches!(Transport::parse(endpoint), Err(BusError::InvalidEndpoint(_))),
                "{endpoint} should be rejected"
            );
        }
    }

    #[test]
    fn display_matches_endpoint() {
        let t = Transport::tcp("localhost", 9090);
        assert_eq!(t.to_string(), t.endpoint());
    }
}

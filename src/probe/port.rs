use crate::error::{Error, Result};
use crate::probe::{PortProbe, PortState};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::{TcpStream, lookup_host};

/// [`PortProbe`] that attempts a TCP connect to every resolved address.
///
/// Any successful connect means open. Otherwise a timed-out attempt means
/// filtered, and refusals alone mean closed.
#[derive(Debug, Clone)]
pub struct TcpPortProbe {
    timeout: Duration,
}

impl TcpPortProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpPortProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl PortProbe for TcpPortProbe {
    #[tracing::instrument(skip(self))]
    async fn check(&self, host: &str, port: u16) -> Result<PortState> {
        let addrs: Vec<_> = match tokio::time::timeout(self.timeout, lookup_host((host, port))).await {
            Ok(Ok(addrs)) => addrs.collect(),
            Ok(Err(e)) => return Err(Error::Probe(format!("Failed to resolve {}: {}", host, e))),
            Err(_) => return Err(Error::Probe(format!("Resolving {} timed out", host))),
        };

        if addrs.is_empty() {
            return Err(Error::Probe(format!("{} resolved to no addresses", host)));
        }

        let mut timed_out = false;
        for addr in addrs {
            match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
                Ok(Ok(_stream)) => {
                    tracing::trace!(%addr, "Port open");
                    return Ok(PortState::Open);
                }
                Ok(Err(e)) => {
                    tracing::trace!(%addr, error = %e, "Connect failed");
                }
                Err(_) => {
                    tracing::trace!(%addr, "Connect timed out");
                    timed_out = true;
                }
            }
        }

        Ok(if timed_out {
            PortState::Filtered
        } else {
            PortState::Closed
        })
    }
}

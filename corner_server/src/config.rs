use anyhow::{Context, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// JSON dataset holding sessions, drivers, laps and telemetry
    pub dataset_path: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup (the process environment in
    /// production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = match lookup("BIND_ADDR") {
            Some(s) => s
                .parse()
                .with_context(|| format!("BIND_ADDR is not an IP address: {s}"))?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };
        let port = match lookup("PORT") {
            Some(s) => s
                .parse()
                .with_context(|| format!("PORT is not a valid port: {s}"))?,
            None => 8080,
        };
        let dataset_path = lookup("DATASET_PATH")
            .map(PathBuf::from)
            .context("DATASET_PATH not set")?;

        Ok(Self {
            bind_addr,
            port,
            dataset_path,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

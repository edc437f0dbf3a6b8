//! Hub configuration file
//!
//! Optional TOML file; every field has a default so a partial file works.
//!
//! ```toml
//! tick_ms = 20
//!
//! [discovery]
//! send_port = 54923
//! recv_port = 54924
//! period_ms = 1000
//! node_timeout_ms = 5000
//!
//! [chase]
//! color1 = [255, 0, 0]
//! color2 = [0, 0, 255]
//! speed_ms = 100
//! ```

use anyhow::{Context, Result};
use lighthub_core::Color;
use lighthub_discovery::DiscoveryConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub discovery: DiscoverySection,
    pub chase: ChaseSection,
    /// Effect tick period
    pub tick_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoverySection::default(),
            chase: ChaseSection::default(),
            tick_ms: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    pub bind: IpAddr,
    pub broadcast: IpAddr,
    pub send_port: u16,
    pub recv_port: u16,
    pub period_ms: u64,
    /// Unset disables the liveness sweep
    pub node_timeout_ms: Option<u64>,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        let defaults = DiscoveryConfig::default();
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            broadcast: IpAddr::V4(Ipv4Addr::BROADCAST),
            send_port: defaults.send_port,
            recv_port: defaults.recv_port,
            period_ms: defaults.period.as_millis() as u64,
            node_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaseSection {
    pub color1: [u8; 3],
    pub color2: [u8; 3],
    pub speed_ms: u64,
}

impl Default for ChaseSection {
    fn default() -> Self {
        Self {
            color1: [255, 0, 0],
            color2: [0, 0, 255],
            speed_ms: 100,
        }
    }
}

impl ChaseSection {
    pub fn colors(&self) -> (Color, Color) {
        let [r1, g1, b1] = self.color1;
        let [r2, g2, b2] = self.color2;
        (Color::rgb(r1, g1, b1), Color::rgb(r2, g2, b2))
    }

    pub fn speed(&self) -> Duration {
        Duration::from_millis(self.speed_ms)
    }
}

impl HubConfig {
    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: HubConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.tick_ms > 0, "tick_ms must be greater than zero");
        anyhow::ensure!(
            self.discovery.period_ms > 0,
            "discovery.period_ms must be greater than zero"
        );
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        let section = &self.discovery;
        DiscoveryConfig {
            bind_addr: section.bind,
            broadcast_addr: section.broadcast,
            send_port: section.send_port,
            recv_port: section.recv_port,
            period: Duration::from_millis(section.period_ms),
            node_timeout: section.node_timeout_ms.map(Duration::from_millis),
            ..Default::default()
        }
    }
}

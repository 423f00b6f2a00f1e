use core::net::{IpAddr, Ipv4Addr, SocketAddr};

use agora_primitives::address::NodeAddress;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 2428;

pub const DEFAULT_MAX_PEERS: usize = 8;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[non_exhaustive]
pub struct NetworkConfig {
    pub listen: SocketAddr,

    /// Address peers should use to reach this node. Defaults to the listen
    /// address, with an unspecified IP replaced by loopback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertise: Option<NodeAddress>,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    #[serde(default = "default_max_peers")]
    pub max_peers: usize,
}

const fn default_max_peers() -> usize {
    DEFAULT_MAX_PEERS
}

impl NetworkConfig {
    #[must_use]
    pub const fn new(listen: SocketAddr, bootstrap: BootstrapConfig, max_peers: usize) -> Self {
        Self {
            listen,
            advertise: None,
            bootstrap,
            max_peers,
        }
    }

    #[must_use]
    pub fn with_advertise(mut self, advertise: NodeAddress) -> Self {
        self.advertise = Some(advertise);
        self
    }

    #[must_use]
    pub fn advertised(&self) -> NodeAddress {
        if let Some(advertise) = &self.advertise {
            return advertise.clone();
        }

        let ip = match self.listen.ip() {
            ip if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            ip => ip,
        };

        NodeAddress::new(ip.to_string(), self.listen.port())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::new(
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            BootstrapConfig::default(),
            DEFAULT_MAX_PEERS,
        )
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[non_exhaustive]
pub struct BootstrapConfig {
    #[serde(default)]
    pub nodes: BootstrapNodes,
}

impl BootstrapConfig {
    #[must_use]
    pub const fn new(nodes: BootstrapNodes) -> Self {
        Self { nodes }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(transparent)]
#[non_exhaustive]
pub struct BootstrapNodes {
    pub list: Vec<NodeAddress>,
}

impl BootstrapNodes {
    #[must_use]
    pub const fn new(list: Vec<NodeAddress>) -> Self {
        Self { list }
    }
}

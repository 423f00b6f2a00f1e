use core::fmt;
use core::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Reachable `host:port` of a node. Doubles as the node's identity on the
/// network.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct NodeAddress {
    host: String,
    port: u16,
}

impl NodeAddress {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeAddress({self})")
    }
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum AddressError {
    #[error("missing port in address '{0}'")]
    MissingPort(String),

    #[error("empty host in address '{0}'")]
    EmptyHost(String),

    #[error("invalid port in address '{0}'")]
    InvalidPort(String),
}

impl FromStr for NodeAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((host, port)) = s.rsplit_once(':') else {
            return Err(AddressError::MissingPort(s.to_owned()));
        };

        if host.is_empty() {
            return Err(AddressError::EmptyHost(s.to_owned()));
        }

        let port = port
            .parse()
            .map_err(|_| AddressError::InvalidPort(s.to_owned()))?;

        Ok(Self::new(host, port))
    }
}

impl Serialize for NodeAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = <String as Deserialize>::deserialize(deserializer)?;

        encoded.parse().map_err(serde::de::Error::custom)
    }
}

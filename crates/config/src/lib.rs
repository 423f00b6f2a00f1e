use core::time::Duration;
use std::fs::{read_to_string, write};

use agora_network::config::NetworkConfig;
use agora_primitives::identity::KeyPair;
use agora_store::config::{
    StoreConfig, DEFAULT_LEDGER_MAX_AGE, DEFAULT_LEDGER_PURGE_THRESHOLD, DEFAULT_PERSIST_DELAY,
    DEFAULT_SWEEP_INTERVAL,
};
use agora_store::persist::LEDGER_FILE;
use camino::{Utf8Path, Utf8PathBuf};
use eyre::{Result as EyreResult, WrapErr};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Deserialize, Serialize)]
#[non_exhaustive]
pub struct ConfigFile {
    #[serde(with = "serde_identity")]
    pub identity: KeyPair,

    pub network: NetworkConfig,

    #[serde(default)]
    pub datastore: DataStoreConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[non_exhaustive]
pub struct DataStoreConfig {
    #[serde(rename = "sweep_interval_ms", with = "serde_duration")]
    pub sweep_interval: Duration,

    #[serde(rename = "persist_delay_ms", with = "serde_duration")]
    pub persist_delay: Duration,

    #[serde(rename = "ledger_max_age_ms", with = "serde_duration")]
    pub ledger_max_age: Duration,

    pub ledger_purge_threshold: usize,

    /// Relative paths resolve against the node's home directory.
    pub ledger_file: Utf8PathBuf,
}

impl DataStoreConfig {
    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        StoreConfig::new(
            self.sweep_interval,
            self.persist_delay,
            self.ledger_max_age,
            self.ledger_purge_threshold,
        )
    }
}

impl Default for DataStoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            persist_delay: DEFAULT_PERSIST_DELAY,
            ledger_max_age: DEFAULT_LEDGER_MAX_AGE,
            ledger_purge_threshold: DEFAULT_LEDGER_PURGE_THRESHOLD,
            ledger_file: LEDGER_FILE.into(),
        }
    }
}

impl ConfigFile {
    #[must_use]
    pub const fn new(identity: KeyPair, network: NetworkConfig, datastore: DataStoreConfig) -> Self {
        Self {
            identity,
            network,
            datastore,
        }
    }

    #[must_use]
    pub fn exists(dir: &Utf8Path) -> bool {
        dir.join(CONFIG_FILE).is_file()
    }

    pub fn load(dir: &Utf8Path) -> EyreResult<Self> {
        let path = dir.join(CONFIG_FILE);
        let content = read_to_string(&path)
            .wrap_err_with(|| format!("failed to read configuration from {path:?}"))?;

        toml::from_str(&content).wrap_err_with(|| format!("invalid configuration in {path:?}"))
    }

    pub fn save(&self, dir: &Utf8Path) -> EyreResult<()> {
        let path = dir.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self)?;

        write(&path, content)
            .wrap_err_with(|| format!("failed to write configuration to {path:?}"))?;

        Ok(())
    }
}

mod serde_duration {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// The identity is stored as its base58 private key next to the public key
/// derived from it, which is checked on load.
pub mod serde_identity {
    use core::fmt::{self, Formatter};

    use agora_primitives::identity::{KeyPair, PrivateKey, PublicKey};
    use serde::de::{self, MapAccess};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(keypair: &KeyPair, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("public_key", keypair.public_key())?;
        map.serialize_entry("private_key", keypair.private_key())?;
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<KeyPair, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdentityVisitor;

        impl<'de> de::Visitor<'de> for IdentityVisitor {
            type Value = KeyPair;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("an identity")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut public_key = None::<PublicKey>;
                let mut private_key = None::<PrivateKey>;

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "public_key" => public_key = Some(map.next_value()?),
                        "private_key" => private_key = Some(map.next_value()?),
                        _ => {
                            let _ignored = map.next_value::<de::IgnoredAny>()?;
                        }
                    }
                }

                let private_key =
                    private_key.ok_or_else(|| de::Error::missing_field("private_key"))?;

                let keypair = KeyPair::from(private_key);

                if let Some(public_key) = public_key {
                    if public_key != *keypair.public_key() {
                        return Err(de::Error::custom(
                            "public key does not match the private key",
                        ));
                    }
                }

                Ok(keypair)
            }
        }

        deserializer.deserialize_map(IdentityVisitor)
    }
}

#[cfg(test)]
mod tests {
    use agora_network::config::{BootstrapConfig, BootstrapNodes};
    use agora_primitives::address::NodeAddress;
    use rand::thread_rng;
    use tempfile::tempdir;

    use super::*;

    fn home() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, path) = home();
        assert!(!ConfigFile::exists(&path));

        let identity = KeyPair::random(&mut thread_rng());
        let network = NetworkConfig::new(
            "0.0.0.0:3000".parse().unwrap(),
            BootstrapConfig::new(BootstrapNodes::new(vec![NodeAddress::new("seed.example", 3000)])),
            4,
        );

        ConfigFile::new(identity, network, DataStoreConfig::default())
            .save(&path)
            .unwrap();
        assert!(ConfigFile::exists(&path));

        let loaded = ConfigFile::load(&path).unwrap();

        assert_eq!(loaded.identity.public_key(), identity.public_key());
        assert_eq!(loaded.network.max_peers, 4);
        assert_eq!(
            loaded.network.bootstrap.nodes.list,
            vec![NodeAddress::new("seed.example", 3000)]
        );
        assert_eq!(loaded.datastore.store_config(), StoreConfig::default());
        assert_eq!(loaded.datastore.ledger_file, LEDGER_FILE);
    }

    #[test]
    fn test_datastore_section_is_optional() {
        let identity = KeyPair::random(&mut thread_rng());

        let content = format!(
            "[identity]\nprivate_key = \"{}\"\n\n[network]\nlisten = \"127.0.0.1:3001\"\n",
            toml::Value::try_from(identity.private_key())
                .unwrap()
                .as_str()
                .unwrap()
        );

        let config: ConfigFile = toml::from_str(&content).unwrap();

        assert_eq!(config.identity.public_key(), identity.public_key());
        assert_eq!(config.datastore.sweep_interval, DEFAULT_SWEEP_INTERVAL);
        assert!(config.network.bootstrap.nodes.list.is_empty());
    }

    #[test]
    fn test_mismatched_identity_is_rejected() {
        let (_dir, path) = home();

        let mut rng = thread_rng();
        let identity = KeyPair::random(&mut rng);
        let other = KeyPair::random(&mut rng);

        let content = format!(
            "[identity]\npublic_key = \"{}\"\nprivate_key = \"{}\"\n\n[network]\nlisten = \"127.0.0.1:3001\"\n",
            other.public_key(),
            toml::Value::try_from(identity.private_key())
                .unwrap()
                .as_str()
                .unwrap()
        );
        write(path.join(CONFIG_FILE), content).unwrap();

        assert!(ConfigFile::load(&path).is_err());
    }
}

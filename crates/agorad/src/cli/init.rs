use core::net::SocketAddr;
use std::fs::create_dir_all;

use agora_config::{ConfigFile, DataStoreConfig};
use agora_network::config::{
    BootstrapConfig, BootstrapNodes, NetworkConfig, DEFAULT_MAX_PEERS, DEFAULT_PORT,
};
use agora_primitives::address::NodeAddress;
use agora_primitives::identity::KeyPair;
use clap::Parser;
use eyre::{bail, Result as EyreResult, WrapErr};
use rand::thread_rng;
use tracing::{info, warn};

use crate::cli::RootArgs;

/// Initialize node configuration
#[derive(Debug, Parser)]
pub struct InitCommand {
    /// Address to accept peer connections on
    #[arg(long, value_name = "ADDR")]
    #[arg(default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))]
    pub listen: SocketAddr,

    /// Address peers should dial, if it differs from the listen address
    #[arg(long, value_name = "HOST:PORT")]
    pub advertise: Option<NodeAddress>,

    /// Seed node to bootstrap through, may be repeated
    #[arg(long = "seed", value_name = "HOST:PORT")]
    pub seeds: Vec<NodeAddress>,

    /// Number of peers to authenticate with after bootstrap
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_MAX_PEERS)]
    pub max_peers: usize,

    /// Overwrite an existing configuration
    #[arg(long, short)]
    pub force: bool,
}

impl InitCommand {
    pub fn run(self, root_args: &RootArgs) -> EyreResult<()> {
        let path = &root_args.home;

        if ConfigFile::exists(path) {
            if !self.force {
                bail!("Node is already initialized in {:?}", path);
            }

            warn!(%path, "Overwriting existing configuration");
        }

        create_dir_all(path)
            .wrap_err_with(|| format!("failed to create directory {path:?}"))?;

        let mut network = NetworkConfig::new(
            self.listen,
            BootstrapConfig::new(BootstrapNodes::new(self.seeds)),
            self.max_peers,
        );

        if let Some(advertise) = self.advertise {
            network = network.with_advertise(advertise);
        }

        let identity = KeyPair::random(&mut thread_rng());

        let config = ConfigFile::new(identity, network, DataStoreConfig::default());

        config.save(path)?;

        info!(
            %path,
            public_key = %identity.public_key(),
            address = %config.network.advertised(),
            "Initialized node"
        );

        Ok(())
    }
}

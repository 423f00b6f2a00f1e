use std::sync::Arc;

use agora_network::config::NetworkConfig;
use agora_primitives::clock::SystemClock;
use agora_primitives::identity::KeyPair;
use agora_store::config::StoreConfig;
use agora_store::persist::FilePersister;
use camino::Utf8PathBuf;
use eyre::{Result as EyreResult, WrapErr};
use tokio::signal::ctrl_c;
use tracing::{info, warn};

use crate::listener::EntryLogger;

#[derive(Debug)]
#[non_exhaustive]
pub struct NodeConfig {
    pub home: Utf8PathBuf,
    pub identity: KeyPair,
    pub network: NetworkConfig,
    pub store: StoreConfig,
    /// Ledger file, relative to `home` unless absolute.
    pub ledger_file: Utf8PathBuf,
}

impl NodeConfig {
    #[must_use]
    pub const fn new(
        home: Utf8PathBuf,
        identity: KeyPair,
        network: NetworkConfig,
        store: StoreConfig,
        ledger_file: Utf8PathBuf,
    ) -> Self {
        Self {
            home,
            identity,
            network,
            store,
            ledger_file,
        }
    }
}

/// Runs a node until Ctrl-C. Must be called from within a running actix
/// system.
pub async fn start(config: NodeConfig) -> EyreResult<()> {
    info!(
        public_key = %config.identity.public_key(),
        address = %config.network.advertised(),
        "Starting node"
    );

    let (transport, events) = agora_network::bind(&config.network).await?;

    let persister = FilePersister::spawn(config.home.join(&config.ledger_file));

    let node = crate::spawn(
        Arc::new(transport),
        events,
        config.store,
        Arc::new(SystemClock),
        Arc::new(persister),
    );

    node.store.add_listener(Arc::new(EntryLogger)).await;

    let seeds = config.network.bootstrap.nodes.list.clone();

    match node.network.client.bootstrap(seeds).await {
        Ok(known) => info!(known = known.len(), "Joined the network"),
        Err(err) => warn!(%err, "Bootstrap failed, continuing without peers"),
    }

    let expanded = node
        .network
        .client
        .expand_peers(config.network.max_peers)
        .await;

    info!(
        expanded,
        authenticated = node.network.peers.authenticated().len(),
        "Peer discovery finished"
    );

    ctrl_c().await.wrap_err("failed to listen for shutdown signal")?;

    info!("Shutting down");

    Ok(())
}

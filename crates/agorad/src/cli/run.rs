use agora_config::ConfigFile;
use agora_node::{start, NodeConfig};
use clap::Parser;
use eyre::{bail, Result as EyreResult};

use crate::cli::RootArgs;

/// Run a node
#[derive(Debug, Parser)]
pub struct RunCommand;

impl RunCommand {
    pub async fn run(self, root_args: RootArgs) -> EyreResult<()> {
        let path = root_args.home;

        if !ConfigFile::exists(&path) {
            bail!("Node is not initialized in {:?}", path);
        }

        let config = ConfigFile::load(&path)?;

        let store = config.datastore.store_config();

        start(NodeConfig::new(
            path,
            config.identity,
            config.network,
            store,
            config.datastore.ledger_file,
        ))
        .await
    }
}

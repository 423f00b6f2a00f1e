use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use eyre::Result as EyreResult;

mod init;
mod run;

use init::InitCommand;
use run::RunCommand;

pub const DEFAULT_AGORA_HOME: &str = ".agora";

pub const EXAMPLES: &str = r"
  # Initialize a node that joins through a seed
  $ agorad --home data/node1 init --listen 0.0.0.0:2428 --seed 203.0.113.7:2428

  # Run it
  $ agorad --home data/node1 run
";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(after_help = EXAMPLES)]
pub struct RootCommand {
    #[command(flatten)]
    pub args: RootArgs,

    #[command(subcommand)]
    pub action: SubCommands,
}

#[derive(Debug, Subcommand)]
pub enum SubCommands {
    Init(InitCommand),
    #[command(alias = "up")]
    Run(RunCommand),
}

#[derive(Debug, Parser)]
pub struct RootArgs {
    /// Directory for config and data
    #[arg(long, value_name = "PATH", default_value = DEFAULT_AGORA_HOME)]
    #[arg(env = "AGORA_HOME", hide_env_values = true)]
    pub home: Utf8PathBuf,
}

impl RootCommand {
    pub async fn run(self) -> EyreResult<()> {
        match self.action {
            SubCommands::Init(init) => init.run(&self.args),
            SubCommands::Run(run) => run.run(self.args).await,
        }
    }
}

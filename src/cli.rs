mod home_assistant;
mod remove;
mod run;
mod show;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{
    cli::{remove::RemoveArgs, run::RunArgs, show::ShowArgs},
    config::{Config, InstanceId},
    prelude::*,
    store::FileStore,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: follow the meters and publish the running costs to Home Assistant.
    #[clap(name = "run")]
    Run(Box<RunArgs>),

    /// Print the saved state of every configured instance.
    #[clap(name = "show")]
    Show(ShowArgs),

    /// Forget the saved state of an instance.
    #[clap(name = "remove")]
    Remove(RemoveArgs),
}

impl Command {
    pub async fn run(self) -> Result {
        match self {
            Self::Run(args) => args.run().await,
            Self::Show(args) => args.run().await,
            Self::Remove(args) => args.run().await,
        }
    }
}

#[derive(Parser)]
pub struct InstancesArgs {
    /// Instances file.
    #[clap(long = "instances", env = "AMS_COSTS_INSTANCES", default_value = "instances.toml")]
    pub path: PathBuf,
}

impl InstancesArgs {
    pub fn read(&self) -> Result<Config> {
        Config::read_from(&self.path)
    }
}

#[derive(Parser)]
pub struct StateArgs {
    /// Directory with the saved instance states.
    #[clap(long = "state-dir", env = "AMS_COSTS_STATE_DIR", default_value = ".")]
    pub dir: PathBuf,
}

impl StateArgs {
    pub fn store(&self, instance_id: &InstanceId) -> FileStore {
        FileStore::new(&self.dir, instance_id)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_verify_args() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let args = Args::try_parse_from([
            "ams-costs",
            "run",
            "--home-assistant-access-token",
            "secret",
            "--home-assistant-api-base-url",
            "http://localhost:8123/api",
            "--polling-interval",
            "30s",
            "--state-dir",
            "/var/lib/ams-costs",
            "--dry-run",
        ])
        .unwrap();
        let Command::Run(args) = args.command else {
            panic!("expected the `run` command");
        };
        assert!(args.dry_run);
        assert_eq!(args.polling_interval(), std::time::Duration::from_secs(30));
        assert_eq!(args.state.dir, PathBuf::from("/var/lib/ams-costs"));
    }

    #[test]
    fn test_parse_remove() {
        let args = Args::try_parse_from(["ams-costs", "remove", "cabin"]).unwrap();
        let Command::Remove(args) = args.command else {
            panic!("expected the `remove` command");
        };
        assert_eq!(args.instance_id, InstanceId::from("cabin"));
    }
}

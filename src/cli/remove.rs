use clap::Parser;

use crate::{
    cli::{InstancesArgs, StateArgs},
    config::InstanceId,
    core::store::StateStore,
    prelude::*,
};

#[derive(Parser)]
pub struct RemoveArgs {
    /// ID of the instance to forget. It must already be gone from the instances file, and `run`
    /// must have been restarted since.
    pub instance_id: InstanceId,

    #[clap(flatten)]
    pub instances: InstancesArgs,

    #[clap(flatten)]
    pub state: StateArgs,
}

impl RemoveArgs {
    #[instrument(skip_all, fields(instance = %self.instance_id))]
    pub async fn run(self) -> Result {
        let config = self.instances.read()?;
        ensure!(
            config.get(&self.instance_id).is_none(),
            "instance `{}` is still configured in `{}`, remove it from there first",
            self.instance_id,
            self.instances.path.display(),
        );
        let store = self.state.store(&self.instance_id);
        store.delete().await?;
        info!(path = %store.path().display(), "removed the saved state");
        Ok(())
    }
}

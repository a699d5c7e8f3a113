use chrono::Utc;
use clap::Parser;

use crate::{
    cli::{InstancesArgs, StateArgs},
    core::{period::days_in_month_of, store::StateStore},
    prelude::*,
    tables::{build_fees_table, build_states_table},
};

#[derive(Parser)]
pub struct ShowArgs {
    #[clap(flatten)]
    pub instances: InstancesArgs,

    #[clap(flatten)]
    pub state: StateArgs,
}

impl ShowArgs {
    pub async fn run(self) -> Result {
        let config = self.instances.read()?;
        let days_in_month = days_in_month_of(Utc::now().date_naive());
        for instance in &config.instances {
            let state = self.state.store(&instance.id).load().await?;
            println!("{}", build_states_table(&[(instance.id.clone(), state)], &instance.currency));
            println!("{}", build_fees_table(&instance.fee_table(), &instance.currency, days_in_month));
        }
        Ok(())
    }
}

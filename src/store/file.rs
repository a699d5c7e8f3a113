use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{
    config::InstanceId,
    core::{state::EngineState, store::StateStore},
    prelude::*,
};

const KEY_PREFIX: &str = "ams_costs_store";

/// Current schema version of the saved record.
const VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Record<T> {
    version: u32,
    key: String,
    data: T,
}

/// JSON file per instance in the state directory.
#[must_use]
pub struct FileStore {
    key: String,
    path: PathBuf,
}

impl FileStore {
    pub fn new(state_dir: &Path, instance_id: &InstanceId) -> Self {
        let key = format!("{KEY_PREFIX}_{instance_id}");
        let path = state_dir.join(format!("{key}.json"));
        Self { key, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, contents: &[u8]) -> Result<EngineState> {
        let record: Record<serde_json::Value> = serde_json::from_slice(contents)?;
        ensure!(record.key == self.key, "record key `{}` does not match `{}`", record.key, self.key);
        match record.version {
            1 => Ok(serde_json::from_value(record.data)?),
            version => bail!("unsupported state version {version}"),
        }
    }
}

#[async_trait]
impl StateStore for FileStore {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Option<EngineState>> {
        let contents = match fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to read `{}`", self.path.display()));
            }
        };
        self.parse(&contents)
            .map(Some)
            .with_context(|| format!("failed to parse `{}`", self.path.display()))
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn save(&self, state: &EngineState) -> Result {
        debug!("saving the state…");
        let record = Record { version: VERSION, key: self.key.clone(), data: state };
        let contents = serde_json::to_vec_pretty(&record)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create `{}`", parent.display()))?;
        }
        let temporary_path = self.path.with_extension("json.tmp");
        fs::write(&temporary_path, contents)
            .await
            .with_context(|| format!("failed to write `{}`", temporary_path.display()))?;
        fs::rename(&temporary_path, &self.path)
            .await
            .with_context(|| format!("failed to replace `{}`", self.path.display()))?;
        Ok(())
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn delete(&self) -> Result {
        info!("deleting the state…");
        match fs::remove_file(&self.path).await {
            Err(error) if error.kind() != ErrorKind::NotFound => {
                Err(error).with_context(|| format!("failed to delete `{}`", self.path.display()))
            }
            _ => Ok(()),
        }
    }
}

mod file;
mod queued;

pub use self::{file::FileStore, queued::QueuedStore};

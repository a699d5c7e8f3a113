pub mod engine;
pub mod fee;
pub mod output;
pub mod period;
pub mod sink;
pub mod snapshot;
pub mod source;
pub mod state;
pub mod store;

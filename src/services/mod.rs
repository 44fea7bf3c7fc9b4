pub mod model_sync;

pub use model_sync::{ModelSyncService, SyncError};

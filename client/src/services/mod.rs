pub mod api;
pub mod history;
pub mod notifications;
pub mod storage;
pub mod students;
pub mod traits;

pub use api::ApiClient;
pub use history::HistoryRecorder;
pub use notifications::{Notifier, RefreshBus};
pub use storage::StorageGateway;
pub use students::StudentActions;
pub use traits::{HistoryLog, RemoteStore, StudentDirectory};

pub mod classify;
pub mod log;
pub mod models;
pub mod stats;
pub mod store;

pub use classify::{Category, Severity, classify};
pub use log::{PendingReplacement, ReadingLog, Upsert};
pub use models::{NewReading, Reading, ReadingError, TimeSlot};
pub use stats::{Stats, summarize};
pub use store::FileStore;

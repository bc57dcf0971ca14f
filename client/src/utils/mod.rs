pub mod secret;
pub mod storage;
pub mod time;

pub use secret::mask_secret;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageOp};
pub use time::{Clock, FixedClock, SystemClock};

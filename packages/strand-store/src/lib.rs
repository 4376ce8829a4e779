mod registry;
pub mod store;

pub use registry::{SubscriptionKey, WatchKey};
pub use store::Store;

pub mod store;
pub mod worker;

pub use store::{CacheEntry, CacheEvent, CacheStore, CacheSubscription, Invalidation};
pub use worker::{QueryFetcher, RefetchWorker};

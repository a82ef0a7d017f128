pub mod error;
pub mod key;
pub mod value;

pub use error::{CacheError, MutationError, Result};
pub use key::{EntityKind, QueryKey};
pub use value::{CacheItem, CacheValue, MutationId, TEMP_ID_PREFIX};

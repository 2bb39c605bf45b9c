//! Time-bounded memoization for expensive handler work.

pub mod clock;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ttl::{CacheEntry, Memoized, TtlCache, DEFAULT_TTL};

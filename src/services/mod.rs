// Service exports
pub mod cache;
pub mod discovery;
pub mod matches;
pub mod memory;
pub mod notifier;
pub mod ports;
pub mod postgres;
pub mod quota;

pub use cache::{CacheError, CacheKey, CacheManager, CacheStats, CachedPhotoStore};
pub use discovery::{DiscoveryOptions, DiscoveryService, Stores};
pub use matches::{MatchCoordinator, MatchCreation};
pub use memory::MemoryStore;
pub use notifier::{HttpNotifier, LogNotifier};
pub use ports::{
    BlockStore, CandidateRepository, LikeNotification, MatchNotification, MatchStore, Notifier,
    NotifyError, PhotoStore, PreferenceStore, ProfileStore, QuotaStore, StoreError, StoreResult,
    SubscriptionStore, SwipeInsert, SwipeLedger,
};
pub use postgres::PgStore;
pub use quota::{QuotaTracker, Reservation};

pub mod cache;
pub use cache::ResultCache;

pub mod history;
pub use history::{HistoryExport, ImportSummary, SearchHistory};

pub mod pagination;
pub use pagination::{InfiniteScroll, ScrollOutcome, SentinelEntry};

pub mod persistence;
pub use persistence::{FileStorage, MemoryStorage, PersistedState, StateStorage};

pub mod store;
pub use store::{SearchStore, StoreSnapshot, SuggestionPhase};

pub mod suggestions;
pub use suggestions::{NavigationKey, SelectionOutcome, SuggestionCoordinator};

pub mod url_sync;
pub use url_sync::UrlState;

pub mod validation;
pub use validation::QueryValidator;

//! Store notifications.
//!
//! Every store action emits one of these on the store's broadcast channel so
//! that views can re-render without polling.

use serde::Serialize;

use crate::error::ErrorKind;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum StoreEvent {
    SearchStarted {
        query: String,
        page: u32,
    },
    ResultsUpdated {
        total: u64,
        loaded: usize,
        from_cache: bool,
        appended: bool,
    },
    SearchFailed {
        kind: ErrorKind,
        message: String,
    },
    SearchCleared,

    FiltersChanged {
        active_count: usize,
    },
    SortChanged {
        sort: String,
    },
    ViewModeChanged,

    SuggestionsUpdated {
        query: String,
        count: usize,
    },
    SuggestionsCleared,

    HistoryChanged {
        recent: usize,
        saved: usize,
    },
    FilterOptionsLoaded,
}

pub mod history;
pub mod options;
pub mod product;
pub mod result;
pub mod suggestion;

pub use history::{SavedSearch, SavedSearchUpdate, SearchTerm};
pub use options::{CategoryOption, FilterOptions, PriceRangeOption, VendorOption};
pub use product::Product;
pub use result::{Facet, FacetOption, Pagination, SearchResult};
pub use suggestion::{SearchSuggestion, SuggestionMetadata, SuggestionType};

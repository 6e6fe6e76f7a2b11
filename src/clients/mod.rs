pub mod encoding;
pub mod search_api;

pub use search_api::{HttpSearchApi, SearchApi};

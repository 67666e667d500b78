pub mod cache;
pub mod error;
pub mod query;
pub mod retriever;
pub mod retry;
pub mod search;
pub mod stac_client;

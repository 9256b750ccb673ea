//! HRMS employee and attendance access: the backend client, the local
//! fallback store, and the dispatch that joins them.

pub mod api_types;
pub mod client;
pub mod error;
pub mod fallback_client;
pub mod store;
pub mod types;

pub use client::HrmsClient;
pub use error::ApiError;
pub use fallback_client::HrmsApi;
pub use store::HrmsStore;

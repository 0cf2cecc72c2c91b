//! Read-only view of a dataset's access info, with credentials masked

pub mod queries;
pub mod routes;

pub use queries::{AccessInfoItem, ListAccessInfoError, ListAccessInfoQuery};
pub use routes::access_info_routes;

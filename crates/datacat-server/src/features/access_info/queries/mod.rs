pub mod list;

pub use list::{AccessInfoItem, ListAccessInfoError, ListAccessInfoQuery};

//! Access parameters of one dataset
//!
//! The catalog stores connection details as loose `field`/`value` rows.
//! [`AccessParams`] folds them into one ordered map: the last row for a
//! field wins, but the field keeps the position where it first appeared.

use crate::db::{AccessInfoStore, DbResult};
use datacat_common::types::AccessInfo;
use std::fmt;
use url::Url;

/// Fields whose values never appear in logs or listings
pub const SENSITIVE_FIELDS: &[&str] = &["ftp_password", "key", "connection_string", "password"];

/// Replacement text for sensitive values
pub const MASK: &str = "********";

/// Fields holding URLs whose query string or userinfo may carry credentials
pub const URL_FIELDS: &[&str] = &["api_url", "url"];

pub fn is_sensitive(field: &str) -> bool {
    SENSITIVE_FIELDS.contains(&field)
}

/// Value of a field as it may be shown outside the export pipeline
///
/// Sensitive fields are replaced whole. URL fields keep scheme, host, path
/// and query parameter names; query values and passwords are masked.
pub fn masked_value(field: &str, value: &str) -> String {
    if is_sensitive(field) {
        return MASK.to_string();
    }
    if !URL_FIELDS.contains(&field) {
        return value.to_string();
    }

    match Url::parse(value.trim()) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some(MASK)).is_err() {
                return MASK.to_string();
            }
            if url.query().is_some() {
                let names: Vec<String> = url.query_pairs().map(|(name, _)| name.into_owned()).collect();
                url.query_pairs_mut()
                    .clear()
                    .extend_pairs(names.iter().map(|name| (name.as_str(), MASK)));
            }
            url.to_string()
        },
        Err(_) => match value.split_once('?') {
            Some((base, _)) => format!("{}?{}", base, MASK),
            None => value.to_string(),
        },
    }
}

/// Ordered field → value map
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AccessParams {
    entries: Vec<(String, String)>,
}

impl AccessParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold access info rows, in the order given
    pub fn from_access_info<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = AccessInfo>,
    {
        rows.into_iter().map(|info| (info.field, info.value)).collect()
    }

    /// Set a field, replacing any earlier value in place
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a field, treating blank values as absent
    pub fn get_non_empty(&self, field: &str) -> Option<&str> {
        self.get(field).filter(|v| !v.trim().is_empty())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get_non_empty(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(f, v)| (f.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Required fields that are absent or blank, in the order asked
    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|field| !self.contains(field))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for AccessParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = AccessParams::new();
        for (field, value) in iter {
            params.insert(field, value);
        }
        params
    }
}

impl fmt::Debug for AccessParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(k, v)| (k, masked_value(k, v))))
            .finish()
    }
}

/// Load the access parameters of a dataset
#[tracing::instrument(skip(store))]
pub async fn load(store: &dyn AccessInfoStore, dataset_id: i32) -> DbResult<AccessParams> {
    let rows = store.list_access_info(dataset_id).await?;
    let params = AccessParams::from_access_info(rows);
    tracing::debug!(fields = params.len(), "Loaded access parameters");
    Ok(params)
}

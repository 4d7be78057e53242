//! # Attribute View
//!
//! A stored record is an id plus a flat map of string fields. [`Record`] is
//! the read/write view over that map: reading an unset field yields `None`,
//! never an error. Typed entities convert to and from it through
//! [`StoredRecord`], so missing or renamed fields surface in one place.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};

use crate::error::{AppError, Result};
use crate::keys::Collection;
use crate::traits::Clock;

/// Field name → value, as held in one store hash.
pub type FieldMap = BTreeMap<String, String>;

/// Builds a [`FieldMap`] from `(name, value)` pairs.
pub fn field_map<'a>(pairs: impl IntoIterator<Item = (&'a str, String)>) -> FieldMap {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Wall-clock time truncated to whole seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }
}

/// Timestamps are stored as whole seconds since the Unix epoch.
pub fn timestamp_value(at: DateTime<Utc>) -> String {
    at.timestamp().to_string()
}

/// One record of a collection: its id and raw fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    collection: Collection,
    id: String,
    fields: FieldMap,
}

impl Record {
    pub fn new(collection: Collection, id: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            collection,
            id: id.into(),
            fields,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The store key this record lives under.
    pub fn key(&self) -> String {
        self.collection.record_key(&self.id)
    }

    /// Reads a field. Unset fields read as `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Reads a field that every valid record of this collection carries.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| self.invalid(format!("missing field `{name}`")))
    }

    pub fn parse<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.require(name)?;
        raw.parse()
            .map_err(|e| self.invalid(format!("field `{name}` = {raw:?}: {e}")))
    }

    pub fn parse_opt<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(name) {
            Some(_) => self.parse(name).map(Some),
            None => Ok(None),
        }
    }

    pub fn timestamp(&self, name: &str) -> Result<DateTime<Utc>> {
        let secs: i64 = self.parse(name)?;
        DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| self.invalid(format!("field `{name}` out of range: {secs}")))
    }

    fn invalid(&self, reason: String) -> AppError {
        AppError::InvalidRecord {
            key: self.key(),
            reason,
        }
    }
}

/// A typed entity persisted as one record hash.
pub trait StoredRecord: Sized {
    const COLLECTION: Collection;

    fn from_record(record: &Record) -> Result<Self>;

    /// Every persisted field except the id, which is the key suffix.
    fn to_fields(&self) -> FieldMap;
}

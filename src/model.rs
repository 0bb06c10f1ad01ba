//! Domain types shared by the store and the HTTP layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Descriptive tag attached to every record. Any value may be replaced by any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneStatus {
    #[default]
    Unknown,
    HasFb,
    NoFb,
    Review,
}

impl PhoneStatus {
    pub const ALL: [PhoneStatus; 4] = [
        PhoneStatus::Unknown,
        PhoneStatus::HasFb,
        PhoneStatus::NoFb,
        PhoneStatus::Review,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhoneStatus::Unknown => "unknown",
            PhoneStatus::HasFb => "has_fb",
            PhoneStatus::NoFb => "no_fb",
            PhoneStatus::Review => "review",
        }
    }
}

impl fmt::Display for PhoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown phone status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for PhoneStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhoneStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Store-assigned record identifier, exposed to clients as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new_random() -> Self {
        RecordId(Uuid::new_v4())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The identifier string is not in the store's identifier format.
#[derive(Debug, Error)]
#[error("invalid record id: {0}")]
pub struct InvalidRecordId(pub String);

impl FromStr for RecordId {
    type Err = InvalidRecordId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(RecordId)
            .map_err(|_| InvalidRecordId(s.to_string()))
    }
}

/// A stored phone entry as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhoneRecord {
    pub id: RecordId,
    pub phone: String,
    pub country: Option<String>,
    pub status: PhoneStatus,
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Optional list/export filters.
///
/// `status` is compared verbatim against the stored value without parsing it
/// into [`PhoneStatus`], so an unknown tag matches nothing.
/// `query` is a literal, case-insensitive substring matched against phone,
/// note and country.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneFilter {
    pub status: Option<String>,
    pub query: Option<String>,
}

impl PhoneFilter {
    /// Builds a filter, treating empty strings as absent.
    pub fn new(status: Option<String>, query: Option<String>) -> Self {
        Self {
            status: status.filter(|s| !s.is_empty()),
            query: query.filter(|q| !q.is_empty()),
        }
    }

    pub fn matches(&self, record: &PhoneRecord) -> bool {
        if let Some(status) = &self.status {
            if record.status.as_str() != status.as_str() {
                return false;
            }
        }
        match &self.query {
            None => true,
            Some(query) => {
                let needle = query.to_lowercase();
                let contains = |field: Option<&str>| {
                    field.is_some_and(|value| value.to_lowercase().contains(&needle))
                };
                contains(Some(record.phone.as_str()))
                    || contains(record.note.as_deref())
                    || contains(record.country.as_deref())
            }
        }
    }
}

/// Sparse set of fields to overwrite. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneChanges {
    pub phone: Option<String>,
    pub country: Option<String>,
    pub status: Option<PhoneStatus>,
    pub note: Option<String>,
}

impl PhoneChanges {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none()
            && self.country.is_none()
            && self.status.is_none()
            && self.note.is_none()
    }

    pub fn apply(&self, record: &mut PhoneRecord) {
        if let Some(phone) = &self.phone {
            record.phone = phone.clone();
        }
        if let Some(country) = &self.country {
            record.country = Some(country.clone());
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(note) = &self.note {
            record.note = Some(note.clone());
        }
    }
}

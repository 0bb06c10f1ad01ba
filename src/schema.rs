//! Record schema: the `phonenumber` table and the validation pass every
//! record goes through before it is inserted.
//!
//! Request bodies are shape-checked by serde at the HTTP boundary. The rules
//! here are stricter and independent of that: a body can be well-formed and
//! still fail them.

use thiserror::Error;

use crate::model::PhoneStatus;

pub const COLLECTION: &str = "phonenumber";

pub const MAX_PHONE_LEN: usize = 32;
pub const MAX_COUNTRY_LEN: usize = 64;
pub const MAX_NOTE_LEN: usize = 2000;

/// DDL for the single collection. `seq` gives the store's natural (insertion) order.
pub const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS phonenumber (
    seq BIGINT GENERATED ALWAYS AS IDENTITY,
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    phone TEXT NOT NULL,
    country TEXT,
    status TEXT NOT NULL DEFAULT 'unknown'
        CHECK (status IN ('unknown', 'has_fb', 'no_fb', 'review')),
    note TEXT,
    created_at TIMESTAMPTZ,
    updated_at TIMESTAMPTZ
)
"#;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("phone is blank")]
    BlankPhone,

    #[error("phone is {len} characters long, at most {max} allowed")]
    PhoneTooLong { len: usize, max: usize },

    #[error("phone contains disallowed character {0:?}")]
    PhoneCharacter(char),

    #[error("phone contains no digits")]
    PhoneWithoutDigits,

    #[error("{field} is {len} characters long, at most {max} allowed")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

/// A record that passed schema validation. The store only inserts these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    phone: String,
    country: Option<String>,
    status: PhoneStatus,
    note: Option<String>,
}

impl PhoneNumber {
    pub fn new(
        phone: String,
        country: Option<String>,
        status: PhoneStatus,
        note: Option<String>,
    ) -> Result<Self, SchemaError> {
        validate_phone(&phone)?;
        validate_len("country", country.as_deref(), MAX_COUNTRY_LEN)?;
        validate_len("note", note.as_deref(), MAX_NOTE_LEN)?;
        Ok(Self {
            phone,
            country,
            status,
            note,
        })
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn status(&self) -> PhoneStatus {
        self.status
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

fn validate_phone(phone: &str) -> Result<(), SchemaError> {
    let trimmed = phone.trim();
    if trimmed.is_empty() {
        return Err(SchemaError::BlankPhone);
    }
    let len = trimmed.chars().count();
    if len > MAX_PHONE_LEN {
        return Err(SchemaError::PhoneTooLong {
            len,
            max: MAX_PHONE_LEN,
        });
    }
    if let Some(bad) = trimmed
        .chars()
        .find(|c| !(c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')' | '.')))
    {
        return Err(SchemaError::PhoneCharacter(bad));
    }
    if !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return Err(SchemaError::PhoneWithoutDigits);
    }
    Ok(())
}

fn validate_len(field: &'static str, value: Option<&str>, max: usize) -> Result<(), SchemaError> {
    let len = value.map_or(0, |v| v.chars().count());
    if len > max {
        return Err(SchemaError::FieldTooLong { field, len, max });
    }
    Ok(())
}

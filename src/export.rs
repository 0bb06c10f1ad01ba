//! CSV rendering for `GET /phones/export`.

use crate::model::PhoneRecord;

pub const CSV_HEADER: [&str; 4] = ["phone", "country", "status", "note"];

/// Serializes `records` as CSV: one header row, one row per record, CRLF
/// terminated. Missing optional fields become empty strings.
pub fn to_csv(records: &[PhoneRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.write_record([
            record.phone.as_str(),
            record.country.as_deref().unwrap_or_default(),
            record.status.as_str(),
            record.note.as_deref().unwrap_or_default(),
        ])?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PhoneStatus, RecordId};

    fn record(phone: &str, country: Option<&str>, note: Option<&str>) -> PhoneRecord {
        PhoneRecord {
            id: RecordId::new_random(),
            phone: phone.into(),
            country: country.map(Into::into),
            status: PhoneStatus::HasFb,
            note: note.map(Into::into),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn header_only_for_empty_set() {
        let csv = to_csv(&[]).unwrap();
        assert_eq!(csv, b"phone,country,status,note\r\n");
    }

    #[test]
    fn missing_fields_render_empty_and_specials_are_quoted() {
        let csv = to_csv(&[
            record("555-1234", None, None),
            record("+1 555", Some("us"), Some("said \"hi\", twice")),
        ])
        .unwrap();
        let text = String::from_utf8(csv).unwrap();
        assert_eq!(
            text,
            "phone,country,status,note\r\n\
             555-1234,,has_fb,\r\n\
             +1 555,us,has_fb,\"said \"\"hi\"\", twice\"\r\n"
        );
    }
}

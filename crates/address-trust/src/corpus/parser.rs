use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::io::Read;
use tracing::warn;

/// Reads every well-formed row of a CSV table. Rows that fail to deserialize
/// are skipped with a warning; only I/O failures abort the read.
pub(crate) fn read_rows<T, R>(reader: R, table: &'static str) -> Result<Vec<T>, csv::Error>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for record in csv_reader.deserialize::<T>() {
        match record {
            Ok(row) => rows.push(row),
            Err(err) if err.is_io_error() => return Err(err),
            Err(err) => warn!(table, %err, "skipping malformed reference row"),
        }
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
pub(crate) struct GridRow {
    #[serde(alias = "digipin")]
    pub(crate) cell_id: String,
    #[serde(default)]
    pub(crate) locality: String,
    #[serde(default)]
    pub(crate) city: String,
    #[serde(default, alias = "pin")]
    pub(crate) postal_code: String,
    #[serde(default)]
    pub(crate) lat: String,
    #[serde(default)]
    pub(crate) long: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeliveryRow {
    #[serde(alias = "digipin")]
    pub(crate) cell_id: String,
    pub(crate) delivery_date: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PingRow {
    #[serde(alias = "digipin")]
    pub(crate) cell_id: String,
    pub(crate) last_ping: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LandmarkRow {
    #[serde(alias = "digipin")]
    pub(crate) cell_id: String,
    pub(crate) landmark_type: String,
    pub(crate) landmark_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) lat: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) long: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostalRow {
    #[serde(alias = "pin")]
    pub(crate) postal_code: String,
    pub(crate) lat: String,
    pub(crate) long: String,
    #[serde(default)]
    pub(crate) district: String,
    #[serde(default)]
    pub(crate) state: String,
}

pub(crate) fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Accepts RFC 3339, ISO local date-times (with `T` or a space, optional
/// fractional seconds) and bare dates.
pub(crate) fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_datetime_supports_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(parse_datetime("2025-03-14T09:30:00Z"), Some(expected));
        assert_eq!(parse_datetime("2025-03-14T09:30:00"), Some(expected));
        assert_eq!(parse_datetime("2025-03-14 09:30:00.000"), Some(expected));
        assert_eq!(
            parse_datetime("2025-03-14"),
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap().and_hms_opt(0, 0, 0)
        );
        assert!(parse_datetime("   ").is_none());
        assert!(parse_datetime("yesterday").is_none());
    }

    #[test]
    fn read_rows_skips_malformed_rows() {
        let csv = "digipin,delivery_date\nBG-1,2025-01-01\nBG-2\nBG-3,2025-01-03\n";
        let rows: Vec<DeliveryRow> =
            read_rows(Cursor::new(csv), "deliveries").expect("rows parse");
        let cells: Vec<&str> = rows.iter().map(|row| row.cell_id.as_str()).collect();
        assert_eq!(cells, vec!["BG-1", "BG-3"]);
    }

    #[test]
    fn landmark_coordinates_are_optional() {
        let csv = "digipin,landmark_type,landmark_name,lat,long\nBG-1,temple,Sri Rama Temple,,\n";
        let rows: Vec<LandmarkRow> = read_rows(Cursor::new(csv), "landmarks").expect("rows parse");
        assert_eq!(rows.len(), 1);
        assert!(rows[0].lat.is_none());
        assert!(rows[0].long.is_none());
    }
}

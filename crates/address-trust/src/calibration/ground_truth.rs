use crate::corpus::parser::read_rows;
use crate::corpus::CorpusError;
use crate::domain::{Address, Coordinate, ValidationLevel};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// One labeled address with its verified outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruthRecord {
    pub test_id: String,
    pub address: Address,
    pub verified_acs: f64,
    pub verified_vl: ValidationLevel,
    pub verified_position: Coordinate,
    pub fraud: bool,
}

#[derive(Debug, Deserialize)]
struct GroundTruthRow {
    test_id: String,
    #[serde(default, alias = "house_no")]
    house_number: String,
    #[serde(default)]
    street: String,
    #[serde(default)]
    locality: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    district: String,
    #[serde(default)]
    state: String,
    #[serde(default, alias = "pin")]
    postal_code: String,
    #[serde(default, alias = "digipin")]
    cell_id: String,
    verified_acs: String,
    verified_vl: String,
    verified_lat: String,
    verified_long: String,
    #[serde(default)]
    fraud_label: String,
}

impl GroundTruthRow {
    fn into_record(self) -> Option<GroundTruthRecord> {
        let verified_acs = self.verified_acs.trim().parse::<f64>().ok()?;
        let verified_vl = self.verified_vl.parse::<ValidationLevel>().ok()?;
        let verified_position = Coordinate::parse(&self.verified_lat, &self.verified_long)?;

        Some(GroundTruthRecord {
            fraud: parse_fraud_label(&self.fraud_label),
            address: Address {
                house_number: self.house_number,
                street: self.street,
                locality: self.locality,
                city: self.city,
                district: self.district,
                state: self.state,
                postal_code: self.postal_code,
                cell_id: self.cell_id,
            },
            test_id: self.test_id,
            verified_acs,
            verified_vl,
            verified_position,
        })
    }
}

pub(crate) fn parse_fraud_label(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

/// Reads labeled records, skipping rows whose score, level or coordinates do
/// not parse.
pub fn load_ground_truth<R: Read>(reader: R) -> Result<Vec<GroundTruthRecord>, CorpusError> {
    let rows: Vec<GroundTruthRow> = read_rows(reader, "ground_truth")?;
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        let test_id = row.test_id.clone();
        match row.into_record() {
            Some(record) => records.push(record),
            None => warn!(%test_id, "skipping ground-truth row with unparseable labels"),
        }
    }

    Ok(records)
}

pub fn load_ground_truth_file<P: AsRef<Path>>(path: P) -> Result<Vec<GroundTruthRecord>, CorpusError> {
    let path = path.as_ref();
    let records = load_ground_truth(std::fs::File::open(path)?)?;
    info!(path = %path.display(), records = records.len(), "ground truth loaded");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "test_id,house_no,street,locality,city,district,state,pin,digipin,verified_acs,verified_vl,verified_lat,verified_long,fraud_label\n";

    #[test]
    fn rows_map_legacy_headers_onto_address_fields() {
        let csv = format!(
            "{HEADER}GT001,12,Temple Road,Round South,Thrissur,Thrissur,Kerala,680001,TS-6800-01-XX,88.5,VL3,10.5276,76.2144,False\n"
        );
        let records = load_ground_truth(Cursor::new(csv)).expect("parses");

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.test_id, "GT001");
        assert_eq!(record.address.house_number, "12");
        assert_eq!(record.address.postal_code, "680001");
        assert_eq!(record.address.cell_id, "TS-6800-01-XX");
        assert_eq!(record.verified_acs, 88.5);
        assert_eq!(record.verified_vl, ValidationLevel::Vl3);
        assert!(!record.fraud);
    }

    #[test]
    fn rows_with_bad_labels_are_skipped() {
        let csv = format!(
            "{HEADER}GT001,1,,,,,,,,not-a-number,VL1,10.0,76.0,False\n\
             GT002,1,,,,,,,,50,VL9,10.0,76.0,False\n\
             GT003,1,,,,,,,,50,VL1,north,76.0,False\n\
             GT004,1,,,,,,,,50,vl1,10.0,76.0,True\n"
        );
        let records = load_ground_truth(Cursor::new(csv)).expect("parses");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].test_id, "GT004");
        assert!(records[0].fraud);
    }

    #[test]
    fn fraud_labels_accept_common_spellings() {
        for label in ["True", "true", "1", "YES", " yes "] {
            assert!(parse_fraud_label(label), "{label}");
        }
        for label in ["False", "0", "", "no", "maybe"] {
            assert!(!parse_fraud_label(label), "{label}");
        }
    }
}

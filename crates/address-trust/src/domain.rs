use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Self-declared address exactly as submitted. Identity across submissions is
/// the fingerprint of its canonical form, never a storage key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, alias = "house_no")]
    pub house_number: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub locality: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, alias = "pin")]
    pub postal_code: String,
    #[serde(default, alias = "digipin")]
    pub cell_id: String,
}

impl Address {
    /// Every field in canonical order, paired with its stable name.
    pub fn fields(&self) -> [(&'static str, &str); 8] {
        [
            ("house_number", &self.house_number),
            ("street", &self.street),
            ("locality", &self.locality),
            ("city", &self.city),
            ("district", &self.district),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("cell_id", &self.cell_id),
        ]
    }

    /// Free-text fields a resident writes by hand (no codes).
    pub(crate) fn free_text(&self) -> [&str; 6] {
        [
            &self.house_number,
            &self.street,
            &self.locality,
            &self.city,
            &self.district,
            &self.state,
        ]
    }
}

/// Decimal-degree position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub long: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }

    pub(crate) fn parse(lat: &str, long: &str) -> Option<Self> {
        let lat = lat.trim().parse::<f64>().ok()?;
        let long = long.trim().parse::<f64>().ok()?;
        if !lat.is_finite() || !long.is_finite() {
            return None;
        }
        Some(Self { lat, long })
    }
}

/// Ordinal validation level derived from the ACS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidationLevel {
    #[serde(rename = "VL0")]
    Vl0,
    #[serde(rename = "VL1")]
    Vl1,
    #[serde(rename = "VL2")]
    Vl2,
    #[serde(rename = "VL3")]
    Vl3,
}

impl ValidationLevel {
    pub const fn ordered() -> [Self; 4] {
        [Self::Vl0, Self::Vl1, Self::Vl2, Self::Vl3]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Vl0 => "VL0",
            Self::Vl1 => "VL1",
            Self::Vl2 => "VL2",
            Self::Vl3 => "VL3",
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Vl0 => 0,
            Self::Vl1 => 1,
            Self::Vl2 => 2,
            Self::Vl3 => 3,
        }
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown validation level '{0}' (expected VL0-VL3)")]
pub struct UnknownValidationLevel(pub String);

impl FromStr for ValidationLevel {
    type Err = UnknownValidationLevel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "VL0" => Ok(Self::Vl0),
            "VL1" => Ok(Self::Vl1),
            "VL2" => Ok(Self::Vl2),
            "VL3" => Ok(Self::Vl3),
            _ => Err(UnknownValidationLevel(value.to_string())),
        }
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

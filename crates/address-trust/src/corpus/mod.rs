//! Read-only reference corpora keyed for O(1) lookup: grid cells, delivery
//! logs, device pings, landmarks, and postal-code centroids.

pub(crate) mod parser;

use crate::domain::Coordinate;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use parser::{DeliveryRow, GridRow, LandmarkRow, PingRow, PostalRow};

pub const GRID_FILE: &str = "grid_cells.csv";
pub const DELIVERY_FILE: &str = "delivery_logs.csv";
pub const PING_FILE: &str = "device_pings.csv";
pub const LANDMARK_FILE: &str = "landmarks.csv";
pub const POSTAL_FILE: &str = "postal_centroids.csv";
pub const GROUND_TRUTH_FILE: &str = "ground_truth.csv";

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("failed to read reference table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid reference CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Reference-grid entry for one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub locality: String,
    pub city: String,
    pub postal_code: String,
    pub centroid: Option<Coordinate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Landmark {
    pub kind: String,
    /// Lowercased display name.
    pub name: String,
    pub position: Option<Coordinate>,
}

impl Landmark {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into().to_lowercase(),
            position: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostalCentroid {
    pub position: Coordinate,
    pub district: String,
    pub state: String,
}

/// Reference tables loaded once at startup and shared immutably afterwards.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCorpora {
    cells: HashMap<String, GridCell>,
    deliveries: HashMap<String, Vec<NaiveDateTime>>,
    pings: HashMap<String, Vec<NaiveDateTime>>,
    landmarks: HashMap<String, Vec<Landmark>>,
    postal: HashMap<String, PostalCentroid>,
}

impl ReferenceCorpora {
    /// Loads every table found in `dir`. A missing or unreadable table is
    /// logged and left empty so its dependent providers take the no-data path.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        let mut corpora = Self::default();

        load_table(dir, GRID_FILE, |file| corpora.load_grid(file));
        load_table(dir, DELIVERY_FILE, |file| corpora.load_deliveries(file));
        load_table(dir, PING_FILE, |file| corpora.load_pings(file));
        load_table(dir, LANDMARK_FILE, |file| corpora.load_landmarks(file));
        load_table(dir, POSTAL_FILE, |file| corpora.load_postal_centroids(file));

        info!(
            cells = corpora.cells.len(),
            delivery_cells = corpora.deliveries.len(),
            ping_cells = corpora.pings.len(),
            landmark_cells = corpora.landmarks.len(),
            postal_codes = corpora.postal.len(),
            dir = %dir.display(),
            "reference corpora loaded"
        );

        corpora
    }

    pub fn load_grid<R: Read>(&mut self, reader: R) -> Result<usize, CorpusError> {
        let rows: Vec<GridRow> = parser::read_rows(reader, "grid")?;
        let count = rows.len();
        for row in rows {
            let centroid = Coordinate::parse(&row.lat, &row.long);
            if centroid.is_none() {
                warn!(cell_id = %row.cell_id, "grid cell has no usable centroid");
            }
            self.insert_cell(
                row.cell_id,
                GridCell {
                    locality: row.locality,
                    city: row.city,
                    postal_code: row.postal_code,
                    centroid,
                },
            );
        }
        Ok(count)
    }

    pub fn load_deliveries<R: Read>(&mut self, reader: R) -> Result<usize, CorpusError> {
        let rows: Vec<DeliveryRow> = parser::read_rows(reader, "deliveries")?;
        let mut loaded = 0;
        for row in rows {
            match parser::parse_datetime(&row.delivery_date) {
                Some(at) => {
                    self.record_delivery(row.cell_id, at);
                    loaded += 1;
                }
                None => warn!(
                    cell_id = %row.cell_id,
                    value = %row.delivery_date,
                    "skipping delivery with unparseable date"
                ),
            }
        }
        Ok(loaded)
    }

    pub fn load_pings<R: Read>(&mut self, reader: R) -> Result<usize, CorpusError> {
        let rows: Vec<PingRow> = parser::read_rows(reader, "pings")?;
        let mut loaded = 0;
        for row in rows {
            match parser::parse_datetime(&row.last_ping) {
                Some(at) => {
                    self.record_ping(row.cell_id, at);
                    loaded += 1;
                }
                None => warn!(
                    cell_id = %row.cell_id,
                    value = %row.last_ping,
                    "skipping device ping with unparseable timestamp"
                ),
            }
        }
        Ok(loaded)
    }

    pub fn load_landmarks<R: Read>(&mut self, reader: R) -> Result<usize, CorpusError> {
        let rows: Vec<LandmarkRow> = parser::read_rows(reader, "landmarks")?;
        let count = rows.len();
        for row in rows {
            let position = match (row.lat.as_deref(), row.long.as_deref()) {
                (Some(lat), Some(long)) => Coordinate::parse(lat, long),
                _ => None,
            };
            let mut landmark = Landmark::new(row.landmark_type, row.landmark_name);
            landmark.position = position;
            self.insert_landmark(row.cell_id, landmark);
        }
        Ok(count)
    }

    pub fn load_postal_centroids<R: Read>(&mut self, reader: R) -> Result<usize, CorpusError> {
        let rows: Vec<PostalRow> = parser::read_rows(reader, "postal")?;
        let mut loaded = 0;
        for row in rows {
            match Coordinate::parse(&row.lat, &row.long) {
                Some(position) => {
                    self.insert_postal_centroid(
                        row.postal_code,
                        PostalCentroid {
                            position,
                            district: row.district,
                            state: row.state,
                        },
                    );
                    loaded += 1;
                }
                None => warn!(
                    postal_code = %row.postal_code,
                    "skipping postal centroid with invalid coordinates"
                ),
            }
        }
        Ok(loaded)
    }

    pub fn insert_cell(&mut self, cell_id: impl Into<String>, cell: GridCell) {
        self.cells.insert(cell_id.into(), cell);
    }

    pub fn record_delivery(&mut self, cell_id: impl Into<String>, at: NaiveDateTime) {
        self.deliveries.entry(cell_id.into()).or_default().push(at);
    }

    pub fn record_ping(&mut self, cell_id: impl Into<String>, at: NaiveDateTime) {
        self.pings.entry(cell_id.into()).or_default().push(at);
    }

    pub fn insert_landmark(&mut self, cell_id: impl Into<String>, landmark: Landmark) {
        self.landmarks.entry(cell_id.into()).or_default().push(landmark);
    }

    pub fn insert_postal_centroid(&mut self, postal_code: impl Into<String>, centroid: PostalCentroid) {
        self.postal.insert(postal_code.into(), centroid);
    }

    pub fn has_grid(&self) -> bool {
        !self.cells.is_empty()
    }

    pub fn cell(&self, cell_id: &str) -> Option<&GridCell> {
        self.cells.get(cell_id)
    }

    pub fn cell_centroid(&self, cell_id: &str) -> Option<Coordinate> {
        self.cells.get(cell_id).and_then(|cell| cell.centroid)
    }

    pub fn has_deliveries(&self) -> bool {
        !self.deliveries.is_empty()
    }

    pub fn deliveries_for(&self, cell_id: &str) -> &[NaiveDateTime] {
        self.deliveries.get(cell_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_pings(&self) -> bool {
        !self.pings.is_empty()
    }

    pub fn pings_for(&self, cell_id: &str) -> &[NaiveDateTime] {
        self.pings.get(cell_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn landmarks_for(&self, cell_id: &str) -> &[Landmark] {
        self.landmarks.get(cell_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn postal_centroid(&self, postal_code: &str) -> Option<&PostalCentroid> {
        self.postal.get(postal_code)
    }
}

fn load_table<F>(dir: &Path, file_name: &'static str, load: F)
where
    F: FnOnce(std::fs::File) -> Result<usize, CorpusError>,
{
    let path = dir.join(file_name);
    let outcome = std::fs::File::open(&path)
        .map_err(CorpusError::from)
        .and_then(load);

    match outcome {
        Ok(rows) => info!(table = file_name, rows, "reference table loaded"),
        Err(err) => warn!(
            table = file_name,
            path = %path.display(),
            %err,
            "reference table unavailable; dependent signals will report no data"
        ),
    }
}

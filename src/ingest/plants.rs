/// Plant table ingestion.
///
/// Reads a CSV with at least `Name`, `Latitude`, `Longitude` columns and an
/// optional `Age` (years). Any other column is ignored, including the
/// unnamed index column some exports carry at position 0. When `Age` is
/// missing or zero and an `OperationalFrom` date is present, the age is
/// derived from its year.
///
/// This is the validation boundary: everything downstream receives
/// fixed-shape `PlantRecord`s with range-checked coordinates.
///
/// # Clock injection
/// `IngestOptions::current_year` is passed in rather than read from the
/// system clock, so OperationalFrom-derived ages are deterministic in tests.

use chrono::Datelike;
use std::io::Read;
use std::path::Path;

use crate::config::{Config, ReferencePlant};
use crate::logging::{self, Component};
use crate::model::{valid_coordinates, IngestError, PlantRecord};

pub const COL_NAME: &str = "Name";
pub const COL_LATITUDE: &str = "Latitude";
pub const COL_LONGITUDE: &str = "Longitude";
pub const COL_AGE: &str = "Age";
pub const COL_OPERATIONAL_FROM: &str = "OperationalFrom";

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub missing_age_as_zero: bool,
    pub current_year: i32,
    pub reference_plants: Vec<ReferencePlant>,
}

impl IngestOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            missing_age_as_zero: config.ingest.missing_age_as_zero,
            current_year: chrono::Utc::now().year(),
            reference_plants: config.reference_plants.clone(),
        }
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            missing_age_as_zero: false,
            current_year: chrono::Utc::now().year(),
            reference_plants: Vec::new(),
        }
    }
}

/// Outcome of one ingest: the accepted records and how many rows were
/// dropped for a missing name or unusable coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub records: Vec<PlantRecord>,
    pub dropped_rows: usize,
}

struct ColumnIndex {
    name: usize,
    latitude: usize,
    longitude: usize,
    age: Option<usize>,
    operational_from: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, IngestError> {
        let find = |wanted: &str| headers.iter().position(|h| h.trim() == wanted);

        let name = find(COL_NAME);
        let latitude = find(COL_LATITUDE);
        let longitude = find(COL_LONGITUDE);

        let missing: Vec<String> = [(COL_NAME, name), (COL_LATITUDE, latitude), (COL_LONGITUDE, longitude)]
            .iter()
            .filter(|(_, idx)| idx.is_none())
            .map(|(col, _)| col.to_string())
            .collect();

        match (name, latitude, longitude) {
            (Some(name), Some(latitude), Some(longitude)) => Ok(Self {
                name,
                latitude,
                longitude,
                age: find(COL_AGE),
                operational_from: find(COL_OPERATIONAL_FROM),
            }),
            _ => Err(IngestError::MissingColumns(missing)),
        }
    }
}

/// Loads plant records from any CSV reader.
pub fn load_plants<R: Read>(reader: R, options: &IngestOptions) -> Result<IngestReport, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| IngestError::Csv(e.to_string()))?
        .clone();
    let columns = ColumnIndex::from_headers(&headers)?;

    let mut records = Vec::new();
    let mut dropped_rows = 0;

    for (line_num, result) in csv_reader.records().enumerate() {
        let row = result.map_err(|e| IngestError::Csv(format!("line {}: {}", line_num + 2, e)))?;

        match parse_row(&row, &columns, options) {
            Some(record) => records.push(record),
            None => {
                dropped_rows += 1;
                logging::debug(
                    Component::Ingest,
                    None,
                    &format!("dropping line {}: missing name or invalid coordinates", line_num + 2),
                );
            }
        }
    }

    if dropped_rows > 0 {
        logging::warn(
            Component::Ingest,
            None,
            &format!("{} row(s) dropped for missing name or coordinates", dropped_rows),
        );
    }

    for plant in &options.reference_plants {
        records.push(plant.to_record());
    }

    if records.is_empty() {
        return Err(IngestError::Empty);
    }

    Ok(IngestReport { records, dropped_rows })
}

/// Loads plant records from a CSV file path.
pub fn load_plants_file(path: impl AsRef<Path>, options: &IngestOptions) -> Result<IngestReport, IngestError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| IngestError::Io(format!("Failed to open '{}': {}", path.display(), e)))?;
    load_plants(file, options)
}

fn parse_row(row: &csv::StringRecord, columns: &ColumnIndex, options: &IngestOptions) -> Option<PlantRecord> {
    let name = row.get(columns.name)?.trim();
    if name.is_empty() {
        return None;
    }
    let latitude = parse_number(row.get(columns.latitude))?;
    let longitude = parse_number(row.get(columns.longitude))?;
    if !valid_coordinates(latitude, longitude) {
        return None;
    }

    let mut age = columns
        .age
        .and_then(|idx| parse_number(row.get(idx)))
        .filter(|age| *age >= 0.0);

    // A zero or missing age is taken as "not recorded" when a commissioning
    // date is available.
    if age.is_none_or(|a| a == 0.0) {
        if let Some(derived) = columns
            .operational_from
            .and_then(|idx| row.get(idx))
            .and_then(|value| age_from_operational_date(value, options.current_year))
        {
            age = Some(derived);
        }
    }

    if age.is_none() && options.missing_age_as_zero {
        age = Some(0.0);
    }

    Some(PlantRecord {
        name: name.to_string(),
        latitude,
        longitude,
        age_years: age,
    })
}

/// Parses a numeric cell. Empty, `nan`, `null` and non-numeric cells are
/// `None`; so are infinities.
fn parse_number(cell: Option<&str>) -> Option<f64> {
    let value: f64 = cell?.trim().parse().ok()?;
    if value.is_finite() { Some(value) } else { None }
}

/// Years since the date's leading four-digit year, floored at zero.
pub fn age_from_operational_date(value: &str, current_year: i32) -> Option<f64> {
    let year: i32 = value.trim().get(..4)?.parse().ok()?;
    Some((current_year - year).max(0) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> IngestOptions {
        IngestOptions { current_year: 2025, ..IngestOptions::default() }
    }

    fn load(csv: &str) -> Result<IngestReport, IngestError> {
        load_plants(csv.as_bytes(), &options())
    }

    #[test]
    fn test_basic_table() {
        let report = load("Name,Latitude,Longitude,Age\nIndian Point,41.27,-73.95,49\nVogtle 3,33.14,-81.76,2\n").unwrap();
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].name, "Indian Point");
        assert_eq!(report.records[0].age_years, Some(49.0));
        assert_eq!(report.dropped_rows, 0);
    }

    #[test]
    fn test_leading_index_column_and_extra_columns_ignored() {
        let report = load(",Name,Country,Latitude,Longitude,Age\n0,Doel,BE,51.32,4.26,50\n").unwrap();
        assert_eq!(report.records[0].name, "Doel");
        assert_eq!(report.records[0].latitude, 51.32);
    }

    #[test]
    fn test_missing_required_columns_reported() {
        let err = load("Name,Lat,Lon,Age\nX,1,2,3\n").unwrap_err();
        match err {
            IngestError::MissingColumns(cols) => assert_eq!(cols, vec!["Latitude", "Longitude"]),
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_age_column_leaves_age_unknown() {
        let report = load("Name,Latitude,Longitude\nX,10,20\n").unwrap();
        assert_eq!(report.records[0].age_years, None);
    }

    #[test]
    fn test_blank_and_invalid_ages_are_none() {
        let report = load("Name,Latitude,Longitude,Age\nA,1,1,\nB,1,1,nan\nC,1,1,old\nD,1,1,-4\n").unwrap();
        assert!(report.records.iter().all(|r| r.age_years.is_none()));
    }

    #[test]
    fn test_missing_age_as_zero_option() {
        let opts = IngestOptions { missing_age_as_zero: true, ..options() };
        let report = load_plants("Name,Latitude,Longitude,Age\nA,1,1,\n".as_bytes(), &opts).unwrap();
        assert_eq!(report.records[0].age_years, Some(0.0));
    }

    #[test]
    fn test_age_derived_from_operational_from() {
        let report = load(
            "Name,Latitude,Longitude,Age,OperationalFrom\nA,1,1,,1986-05-01\nB,1,1,0,2010\nC,1,1,12,1970-01-01\n",
        )
        .unwrap();
        assert_eq!(report.records[0].age_years, Some(39.0));
        assert_eq!(report.records[1].age_years, Some(15.0));
        assert_eq!(report.records[2].age_years, Some(12.0), "explicit age wins");
    }

    #[test]
    fn test_future_operational_date_floors_at_zero() {
        assert_eq!(age_from_operational_date("2031-01-01", 2025), Some(0.0));
        assert_eq!(age_from_operational_date("n/a", 2025), None);
        assert_eq!(age_from_operational_date("", 2025), None);
    }

    #[test]
    fn test_rows_without_name_or_coordinates_dropped() {
        let report = load("Name,Latitude,Longitude,Age\n,1,1,5\nB,,1,5\nC,95,1,5\nD,1,1,5\n").unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].name, "D");
        assert_eq!(report.dropped_rows, 3);
    }

    #[test]
    fn test_reference_plants_appended() {
        let opts = IngestOptions {
            reference_plants: vec![ReferencePlant {
                name: "Prayagraj Research Reactor".into(),
                latitude: 25.4358,
                longitude: 81.8463,
                age: Some(22.0),
            }],
            ..options()
        };
        let report = load_plants("Name,Latitude,Longitude,Age\nA,1,1,5\n".as_bytes(), &opts).unwrap();
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[1].name, "Prayagraj Research Reactor");
    }

    #[test]
    fn test_header_only_is_empty_error() {
        assert!(matches!(load("Name,Latitude,Longitude,Age\n"), Err(IngestError::Empty)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_plants_file("./no/such/plants.csv", &options());
        assert!(matches!(result, Err(IngestError::Io(_))));
    }
}

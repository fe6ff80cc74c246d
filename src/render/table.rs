//! Processed plant table export: the input columns plus `Safety`.

use serde::Serialize;

use crate::model::ClassifiedPlant;

pub const PROCESSED_FILE_NAME: &str = "processed_nuclear_plants.csv";

#[derive(Serialize)]
struct ProcessedRow<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "Age")]
    age: Option<f64>,
    #[serde(rename = "Safety")]
    safety: &'static str,
}

/// Writes `Name,Latitude,Longitude,Age,Safety` with a header row. A missing
/// age is an empty field.
pub fn write_processed_csv<W: std::io::Write>(plants: &[ClassifiedPlant], out: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    if plants.is_empty() {
        writer.write_record(["Name", "Latitude", "Longitude", "Age", "Safety"])?;
    }
    for plant in plants {
        writer.serialize(ProcessedRow {
            name: &plant.record.name,
            latitude: plant.record.latitude,
            longitude: plant.record.longitude,
            age: plant.record.age_years,
            safety: plant.safety.as_str(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn processed_csv_string(plants: &[ClassifiedPlant]) -> Result<String, csv::Error> {
    let mut buf = Vec::new();
    write_processed_csv(plants, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

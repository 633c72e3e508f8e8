use crate::error::G4Error;
use crate::model::SyncData;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes one sync result somewhere durable.
pub trait DataExporter {
    /// Export `data`, returning where it was written.
    fn export(&self, data: &SyncData) -> Result<PathBuf, G4Error>;
}

/// Writes each sync as a pretty-printed JSON file named after its as-of time.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn file_name(data: &SyncData) -> String {
        format!("g4-sync-{}.json", data.as_of.format("%Y%m%dT%H%M%SZ"))
    }
}

impl DataExporter for JsonExporter {
    fn export(&self, data: &SyncData) -> Result<PathBuf, G4Error> {
        let path = self.output_dir.join(Self::file_name(data));
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, data)?;
        writer.flush()?;
        info!(
            "Exported {} glucose reads, {} injections, {} food events, {} exercise sessions to {}",
            data.glucose_reads.len(),
            data.insulin_injections.len(),
            data.food_events.len(),
            data.exercise_sessions.len(),
            path.display()
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeviceInfo, GlucoseRead, GlucoseUnit};
    use crate::time::{to_instant, to_local};
    use chrono::{TimeZone, Utc};

    fn data() -> SyncData {
        SyncData {
            glucose_reads: vec![GlucoseRead {
                internal_time: to_instant(126_482_045),
                local_time: to_local(126_453_245),
                value: 83.0,
                unit: GlucoseUnit::MgPerDl,
            }],
            insulin_injections: vec![],
            food_events: vec![],
            exercise_sessions: vec![],
            device_info: DeviceInfo {
                serial_number: "sm30140752".to_string(),
                hardware_id: "{75B7C886-FE10-420F-B511-2D3F9B9BEE7E}".to_string(),
                hardware_revision: "14".to_string(),
            },
            as_of: Utc.with_ymd_and_hms(2013, 1, 4, 8, 30, 0).unwrap(),
        }
    }

    #[test]
    fn file_name_embeds_as_of() {
        assert_eq!(JsonExporter::file_name(&data()), "g4-sync-20130104T083000Z.json");
    }

    #[test]
    fn writes_json_file() {
        let dir = std::env::temp_dir().join(format!("g4sync-export-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let exporter = JsonExporter::new(&dir);
        let path = exporter.export(&data()).unwrap();
        assert_eq!(path, dir.join("g4-sync-20130104T083000Z.json"));

        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["device_info"]["serial_number"], "sm30140752");
        assert_eq!(written["glucose_reads"][0]["value"], 83.0);
        assert_eq!(written["glucose_reads"][0]["unit"], "mg/dL");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

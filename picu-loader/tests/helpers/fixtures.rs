//! HL7 and configuration fixtures

use picu_common::time::TimestampZone;
use picu_loader::config::{LoaderConfig, RawLoaderConfig};
use std::path::Path;

pub const TARGET_PREFIX: &str = "ZB04";

/// Catalog used by the fixtures
pub const CATALOG_CSV: &str = "Id,Label,Code\n\
1,Heart Rate,0002-4182\n\
2,SpO2,0002-4bb8\n\
3,Mean Arterial Pressure,0002-4a15\n\
4,Temperature Core,#002-4b60\n";

#[derive(Debug, Clone)]
pub struct Patient {
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub birth_date: &'static str,
    pub gender: &'static str,
    pub birthplace: &'static str,
}

impl Patient {
    pub fn jane() -> Self {
        Self {
            first_name: "Jane",
            last_name: "Doe",
            birth_date: "20100412",
            gender: "F",
            birthplace: "Baltimore",
        }
    }

    pub fn tom() -> Self {
        Self {
            first_name: "Tom",
            last_name: "Smith",
            birth_date: "20120105",
            gender: "M",
            birthplace: "Towson",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Observation {
    pub channel: &'static str,
    pub value: &'static str,
    pub unit: &'static str,
}

impl Observation {
    pub fn new(channel: &'static str, value: &'static str, unit: &'static str) -> Self {
        Self {
            channel,
            value,
            unit,
        }
    }
}

/// One ORU^R01 message unit, segments separated by CR
pub fn oru_message(
    patient: &Patient,
    observed_at: &str,
    location: &str,
    observations: &[Observation],
) -> String {
    let mut segments = vec![
        format!("MSH|^~\\&|MONITOR|PICU|LOADER|PICU|{observed_at}||ORU^R01|MSG0001|P|2.3"),
        format!(
            "PID|||MRN001||{}^{}||{}|{}|||||||||||||||{}",
            patient.last_name,
            patient.first_name,
            patient.birth_date,
            patient.gender,
            patient.birthplace
        ),
        format!("PV1||I|{location}^BED1"),
        format!("OBR|1|||VITALS|||{observed_at}"),
    ];
    for (i, obs) in observations.iter().enumerate() {
        segments.push(format!(
            "OBX|{}|NM|{}^MDC||{}|{}|||||F",
            i + 1,
            obs.channel,
            obs.value,
            obs.unit
        ));
    }
    let mut message = segments.join("\r");
    message.push('\r');
    message
}

pub fn write_catalog(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("channels.csv");
    std::fs::write(&path, CATALOG_CSV).unwrap();
    path
}

/// Config with inputs under `<dir>/inbox` and outputs in `<dir>`
pub fn test_config(dir: &Path) -> LoaderConfig {
    let inbox = dir.join("inbox");
    std::fs::create_dir_all(&inbox).unwrap();
    let raw = RawLoaderConfig {
        opentsdb_url: Some("http://127.0.0.1:1".to_string()),
        measurement_catalog: Some(write_catalog(dir)),
        subject_registry: Some(dir.join("subjects.csv")),
        target_registry: Some(dir.join("picu_subjects.csv")),
        processed_ledger: Some(dir.join("done.txt")),
        root_dir: Some(inbox),
        target_location_prefix: Some(TARGET_PREFIX.to_string()),
        utc_offset_minutes: Some(0),
        ..RawLoaderConfig::default()
    };
    let config = LoaderConfig::from_raw(raw, None).unwrap();
    assert_eq!(
        config.timestamp_zone,
        TimestampZone::from_offset_minutes(Some(0)).unwrap()
    );
    config
}

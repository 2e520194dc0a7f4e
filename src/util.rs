use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];
    loop {
        let count = file
            .read(&mut buf)
            .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Pretty JSON with a trailing newline; parent directories are created.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let mut data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;
    data.push(b'\n');
    fs::write(path, &data)
        .with_context(|| format!("failed to write json file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_files_round_trip_through_nested_directories() {
        let directory = tempfile::tempdir().expect("tempdir should be created");
        let path = directory.path().join("manifests").join("sample.json");

        write_json_pretty(&path, &vec!["乡土中国", "论语"]).expect("json should be written");
        let loaded: Vec<String> = read_json(&path).expect("json should be read back");
        assert_eq!(loaded, vec!["乡土中国", "论语"]);

        let raw = fs::read_to_string(&path).expect("file should exist");
        assert!(raw.ends_with("]\n"));
    }

    #[test]
    fn sha256_file_matches_known_digest() {
        let directory = tempfile::tempdir().expect("tempdir should be created");
        let path = directory.path().join("abc.txt");
        fs::write(&path, b"abc").expect("file should be written");

        assert_eq!(
            sha256_file(&path).expect("hash should succeed"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn compact_timestamps_have_no_separators() {
        let ts = DateTime::parse_from_rfc3339("2024-05-06T07:08:09Z")
            .expect("timestamp should parse")
            .with_timezone(&Utc);
        assert_eq!(utc_compact_string(ts), "20240506T070809Z");
    }
}

//! JSON I/O for district records.
//!
//! Layout: one `<district>.json` per district in the results directory.
//! Records are read whole and written back with the same name, pretty-printed
//! with 4-space indentation. Writes go to `<district>.json.tmp` first and are
//! renamed over the original, so an interrupted scan never leaves a
//! half-written record.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::district::DistrictRecord;
use crate::error::{PValueError, Result};

/// Path of the record for `name` inside `dir`.
pub fn district_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.json"))
}

/// Check if a file exists on disk.
pub fn file_exists(path: &Path) -> bool {
    path.exists()
}

/// District names (file stems of `*.json`) in `dir`, sorted.
pub fn discover_districts(dir: &Path) -> Result<Vec<String>> {
    let read_dir = fs::read_dir(dir).map_err(|e| PValueError::io(dir, e))?;
    let mut names: Vec<String> = read_dir
        .flatten()
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            name.strip_suffix(".json").map(str::to_string)
        })
        .collect();
    names.sort();
    Ok(names)
}

/// Read and shape-check the record for `name`.
pub fn load_district(dir: &Path, name: &str) -> Result<DistrictRecord> {
    let path = district_path(dir, name);
    if !file_exists(&path) {
        return Err(PValueError::DistrictNotFound {
            name: name.to_string(),
            path,
        });
    }
    let file = File::open(&path).map_err(|e| PValueError::io(&path, e))?;
    let record: DistrictRecord =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| PValueError::MalformedDistrict {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
    record.validate(name)?;
    debug!(
        district = name,
        boxes = record.num_ballot_boxes(),
        groups = record.num_groups(),
        candidates = record.num_candidates(),
        "loaded district"
    );
    Ok(record)
}

/// Write the record for `name`, replacing any previous version atomically.
pub fn save_district(dir: &Path, name: &str, record: &DistrictRecord) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| PValueError::io(dir, e))?;
    let path = district_path(dir, name);
    write_json_atomic(&path, record)
}

/// Serialize `value` to `path` via a temporary sibling and a rename.
///
/// On failure the temporary file is removed and `path` is left as it was.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let written = write_pretty_json(&tmp, value)
        .and_then(|()| fs::rename(&tmp, path).map_err(|e| PValueError::io(path, e)));
    if written.is_err() && file_exists(&tmp) {
        if let Err(e) = fs::remove_file(&tmp) {
            warn!("could not remove {}: {e}", tmp.display());
        }
    }
    written
}

/// Pretty-print `value` with 4-space indentation and flush it to disk.
fn write_pretty_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| PValueError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value.serialize(&mut ser)?;
    writer.write_all(b"\n").map_err(|e| PValueError::io(path, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| PValueError::io(path, e.into_error()))?;
    file.sync_all().map_err(|e| PValueError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> DistrictRecord {
        serde_json::from_value(json!({
            "X": [[1, 2]],
            "W_agg": [[3]],
            "prob": [[0.4, 0.6]],
            "group_agg": [8]
        }))
        .unwrap()
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = record();
        rec.p_values = Some(vec![Some(0.25)]);
        rec.p_values_trials = Some(vec![Some(3)]);
        save_district(dir.path(), "alpha", &rec).unwrap();

        assert!(file_exists(&district_path(dir.path(), "alpha")));
        assert!(!file_exists(&dir.path().join("alpha.json.tmp")));
        let loaded = load_district(dir.path(), "alpha").unwrap();
        assert_eq!(loaded, rec);
    }

    #[test]
    fn test_output_uses_four_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        save_district(dir.path(), "beta", &record()).unwrap();
        let text = fs::read_to_string(district_path(dir.path(), "beta")).unwrap();
        assert!(text.starts_with("{\n    \"X\""), "{text}");
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        save_district(dir.path(), "gamma", &record()).unwrap();
        let path = district_path(dir.path(), "gamma");
        let before = fs::read(&path).unwrap();

        // JSON object keys must be strings, so this fails mid-serialization.
        let bad: std::collections::BTreeMap<(u32, u32), u32> = [((1, 2), 3)].into_iter().collect();
        let err = write_json_atomic(&path, &bad).unwrap_err();
        assert!(matches!(err, PValueError::Json(_)));

        assert!(!file_exists(&dir.path().join("gamma.json.tmp")));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_load_missing_district() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_district(dir.path(), "nowhere").unwrap_err();
        assert!(matches!(err, PValueError::DistrictNotFound { .. }));
    }

    #[test]
    fn test_load_malformed_district() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(district_path(dir.path(), "broken"), "{\"X\": [[1, 2]]").unwrap();
        let err = load_district(dir.path(), "broken").unwrap_err();
        assert!(matches!(err, PValueError::MalformedDistrict { .. }));
    }

    #[test]
    fn test_discover_sorted_json_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zeta.json", "alpha.json", "notes.txt", "mid.json.tmp"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        fs::create_dir(dir.path().join("nested.json")).unwrap();
        let names = discover_districts(dir.path()).unwrap();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use viz_core::error::{Result, VizError};
use viz_core::models::Series;

use crate::loader::SeriesLoader;

/// Recursively find all `*.jsonl` files under `data_path`, sorted by path.
pub fn find_jsonl_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "jsonl")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Replace directories by the JSONL files they contain. Plain paths pass
/// through unchanged, in order, whatever their extension.
pub fn expand_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut expanded = Vec::with_capacity(paths.len());
    for path in paths {
        if path.is_dir() {
            let files = find_jsonl_files(path);
            if files.is_empty() {
                return Err(VizError::NoInputFiles(path.clone()));
            }
            debug!("{}: {} JSONL files", path.display(), files.len());
            expanded.extend(files);
        } else {
            expanded.push(path.clone());
        }
    }
    Ok(expanded)
}

/// Read every line of `path` as one record blob.
///
/// A line that is not valid UTF-8 is a malformed record at that line's
/// index; only I/O failures are reported as [`VizError::FileRead`].
pub fn read_blobs(path: &Path) -> Result<Vec<String>> {
    let file_read = |source: std::io::Error| VizError::FileRead {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(file_read)?;
    let id = path.display().to_string();

    BufReader::new(file)
        .split(b'\n')
        .enumerate()
        .map(|(index, line)| {
            let mut bytes = line.map_err(file_read)?;
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            String::from_utf8(bytes).map_err(|e| {
                VizError::malformed(&id, index, "<record>", format!("invalid UTF-8: {}", e))
            })
        })
        .collect()
}

/// Load one file into a series identified by its path.
pub fn load_series_file(path: &Path, loader: &SeriesLoader) -> Result<Series> {
    let blobs = read_blobs(path)?;
    loader.load(&path.display().to_string(), &blobs)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadMode;
    use std::io::Write;
    use tempfile::TempDir;
    use viz_core::time_utils::TimezoneHandler;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn write_jsonl(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    const RECORD: &str = r#"{"timestamp":"2024-01-10T01:00:00+09:00","download.bandwidth":104857600}"#;

    // ── find_jsonl_files ──────────────────────────────────────────────────────

    #[test]
    fn test_find_jsonl_files_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("router");
        std::fs::create_dir_all(&sub).unwrap();
        write_jsonl(dir.path(), "b.jsonl", &["x"]);
        write_jsonl(dir.path(), "a.jsonl", &["x"]);
        write_jsonl(dir.path(), "notes.txt", &["x"]);
        write_jsonl(&sub, "c.jsonl", &["x"]);

        let files = find_jsonl_files(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.jsonl"),
                PathBuf::from("b.jsonl"),
                PathBuf::from("router/c.jsonl"),
            ]
        );
    }

    #[test]
    fn test_find_jsonl_files_nonexistent_path() {
        assert!(find_jsonl_files(Path::new("/tmp/does-not-exist-speedtest-viz-xyz")).is_empty());
    }

    // ── expand_inputs ─────────────────────────────────────────────────────────

    #[test]
    fn test_expand_inputs_keeps_file_order() {
        let dir = TempDir::new().unwrap();
        let log = write_jsonl(dir.path(), "speedtest.log", &[RECORD]);
        let sub = dir.path().join("more");
        std::fs::create_dir_all(&sub).unwrap();
        let nested = write_jsonl(&sub, "x.jsonl", &[RECORD]);

        let expanded = expand_inputs(&[log.clone(), sub.clone()]).unwrap();
        assert_eq!(expanded, vec![log, nested]);
    }

    #[test]
    fn test_expand_inputs_empty_directory() {
        let dir = TempDir::new().unwrap();
        let err = expand_inputs(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, VizError::NoInputFiles(_)));
    }

    // ── read_blobs / load_series_file ─────────────────────────────────────────

    #[test]
    fn test_read_blobs_missing_file() {
        let err = read_blobs(Path::new("/tmp/does-not-exist-speedtest-viz.log")).unwrap_err();
        assert!(matches!(err, VizError::FileRead { .. }));
    }

    #[test]
    fn test_load_series_file() {
        let dir = TempDir::new().unwrap();
        let path = write_jsonl(dir.path(), "home.jsonl", &[RECORD, "", RECORD]);
        let loader = SeriesLoader::new(LoadMode::Lenient, TimezoneHandler::utc());

        let series = load_series_file(&path, &loader).unwrap();
        assert_eq!(series.id(), path.display().to_string());
        assert_eq!(series.len(), 2);
        assert_eq!(series.records()[0].download_bandwidth, Some(100.0));
    }

    #[test]
    fn test_load_series_file_reports_line_index() {
        let dir = TempDir::new().unwrap();
        let path = write_jsonl(dir.path(), "bad.jsonl", &[RECORD, "", "{oops"]);
        let loader = SeriesLoader::new(LoadMode::Lenient, TimezoneHandler::utc());

        let err = load_series_file(&path, &loader).unwrap_err();
        match err {
            VizError::MalformedRecord { index, .. } => assert_eq!(index, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_blobs_invalid_utf8_is_malformed_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.jsonl");
        let mut bytes = RECORD.as_bytes().to_vec();
        bytes.extend_from_slice(b"\n{\"isp\":\"\xff\xfe\"}\n");
        std::fs::write(&path, bytes).unwrap();

        let err = read_blobs(&path).unwrap_err();
        match err {
            VizError::MalformedRecord {
                series,
                index,
                field,
                ..
            } => {
                assert_eq!(series, path.display().to_string());
                assert_eq!(index, 1);
                assert_eq!(field, "<record>");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_blobs_strips_crlf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crlf.jsonl");
        std::fs::write(&path, format!("{RECORD}\r\n{RECORD}")).unwrap();

        let blobs = read_blobs(&path).unwrap();
        assert_eq!(blobs, vec![RECORD.to_string(), RECORD.to_string()]);
    }
}

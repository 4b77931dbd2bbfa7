use crate::error::CrawlError;
use crate::results::PageRecord;
use crate::storage::record_files;
use std::fs;
use std::io;
use std::path::Path;

/// Read every persisted record in `storage_dir`, in file-name order.
///
/// A record that fails to parse aborts the whole read.
pub fn collect_records(storage_dir: &Path) -> Result<Vec<PageRecord>, CrawlError> {
    let files = record_files(storage_dir)?;
    let mut records = Vec::with_capacity(files.len());

    for path in files {
        let body = fs::read_to_string(&path).map_err(|source| CrawlError::Storage {
            path: path.clone(),
            source,
        })?;
        let record: PageRecord = serde_json::from_str(&body)
            .map_err(|source| CrawlError::MalformedRecord { path, source })?;
        records.push(record);
    }

    Ok(records)
}

/// Combine all persisted records into one pretty-printed JSON array at
/// `output`, replacing any existing file. Returns the number of records
/// written.
pub fn write_output(storage_dir: &Path, output: &Path) -> Result<usize, CrawlError> {
    let records = collect_records(storage_dir)?;

    let output_error = |source: io::Error| CrawlError::Output {
        path: output.to_path_buf(),
        source,
    };
    let body = serde_json::to_string_pretty(&records)
        .map_err(|e| output_error(io::Error::other(e)))?;
    fs::write(output, body).map_err(output_error)?;

    ::log::info!(
        "Wrote {} records from {} to {}",
        records.len(),
        storage_dir.display(),
        output.display()
    );
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Dataset;

    fn seeded_store(dir: &Path) {
        let dataset = Dataset::open(dir).unwrap();
        for n in 1..=3 {
            dataset
                .push(&PageRecord::new(
                    format!("Title {}", n),
                    format!("https://ex.com/{}", n),
                    format!("Body {}", n),
                ))
                .unwrap();
        }
    }

    #[test]
    fn test_writes_array_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        let output = dir.path().join("output.json");
        seeded_store(&store);

        assert_eq!(write_output(&store, &output).unwrap(), 3);

        let written: Vec<PageRecord> =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        let urls: Vec<_> = written.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://ex.com/1", "https://ex.com/2", "https://ex.com/3"]);
    }

    #[test]
    fn test_output_is_pretty_printed_with_two_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        let output = dir.path().join("output.json");
        Dataset::open(&store)
            .unwrap()
            .push(&PageRecord::new("T".into(), "https://ex.com/".into(), "B".into()))
            .unwrap();

        write_output(&store, &output).unwrap();
        let text = fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("[\n  {\n    \"title\": \"T\""));
    }

    #[test]
    fn test_write_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        let output = dir.path().join("output.json");
        seeded_store(&store);

        write_output(&store, &output).unwrap();
        let first = fs::read(&output).unwrap();
        write_output(&store, &output).unwrap();
        let second = fs::read(&output).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_overwrites_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        let output = dir.path().join("output.json");
        fs::write(&output, "stale content that is much longer than the new output").unwrap();

        assert_eq!(write_output(&store, &output).unwrap(), 0);
        assert_eq!(fs::read_to_string(&output).unwrap(), "[]");
    }

    #[test]
    fn test_malformed_record_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        let output = dir.path().join("output.json");
        seeded_store(&store);
        fs::write(store.join("000000004.json"), "{ not json").unwrap();

        let err = write_output(&store, &output).unwrap_err();
        assert!(matches!(err, CrawlError::MalformedRecord { .. }));
        assert!(!output.exists());
    }
}

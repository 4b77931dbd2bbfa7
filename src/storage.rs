use crate::error::CrawlError;
use crate::results::PageRecord;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default location of the per-run record store
pub const DEFAULT_STORAGE_DIR: &str = "storage/datasets/default";

/// Directory of individually persisted page records.
///
/// Each record lands in its own `NNNNNNNNN.json` file with a sequential,
/// 1-based id, so concurrent visits never write to the same file.
#[derive(Debug)]
pub struct Dataset {
    dir: PathBuf,
    next_id: AtomicUsize,
}

impl Dataset {
    /// Open (creating if needed) the store at `dir`. Numbering continues
    /// after the highest id already present.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CrawlError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| storage_error(&dir, source))?;

        let highest = record_files(&dir)?
            .iter()
            .filter_map(|path| record_id(path))
            .max()
            .unwrap_or(0);

        Ok(Self {
            dir,
            next_id: AtomicUsize::new(highest + 1),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove every persisted record and restart numbering at 1
    pub fn purge(&self) -> Result<usize, CrawlError> {
        let files = record_files(&self.dir)?;
        for path in &files {
            fs::remove_file(path).map_err(|source| storage_error(path, source))?;
        }
        self.next_id.store(1, Ordering::SeqCst);
        Ok(files.len())
    }

    /// Persist one record under the next free id
    pub fn push(&self, record: &PageRecord) -> Result<PathBuf, CrawlError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("{:09}.json", id));
        let tmp = self.dir.join(format!("{:09}.json.tmp", id));

        let body = serde_json::to_string_pretty(record).map_err(|source| {
            CrawlError::MalformedRecord {
                path: path.clone(),
                source,
            }
        })?;

        // Written aside then renamed so readers never observe a partial file
        fs::write(&tmp, body).map_err(|source| storage_error(&tmp, source))?;
        fs::rename(&tmp, &path).map_err(|source| storage_error(&path, source))?;

        ::log::trace!("Persisted record {} for {}", path.display(), record.url);
        Ok(path)
    }

    /// Number of records currently in the store
    pub fn len(&self) -> Result<usize, CrawlError> {
        Ok(record_files(&self.dir)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, CrawlError> {
        Ok(self.len()? == 0)
    }
}

/// All record files in `dir`, sorted by file name. A missing directory is
/// treated as an empty store.
pub fn record_files(dir: &Path) -> Result<Vec<PathBuf>, CrawlError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(storage_error(dir, source)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|source| storage_error(dir, source))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn record_id(path: &Path) -> Option<usize> {
    path.file_stem()?.to_str()?.parse().ok()
}

fn storage_error(path: &Path, source: io::Error) -> CrawlError {
    CrawlError::Storage {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: usize) -> PageRecord {
        PageRecord::new(
            format!("Page {}", n),
            format!("https://ex.com/{}", n),
            format!("text {}", n),
        )
    }

    #[test]
    fn test_push_assigns_sequential_ids() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Dataset::open(dir.path()).unwrap();

        let first = dataset.push(&record(1)).unwrap();
        let second = dataset.push(&record(2)).unwrap();

        assert_eq!(first.file_name().unwrap(), "000000001.json");
        assert_eq!(second.file_name().unwrap(), "000000002.json");
        assert_eq!(dataset.len().unwrap(), 2);

        let stored: PageRecord =
            serde_json::from_str(&fs::read_to_string(&second).unwrap()).unwrap();
        assert_eq!(stored, record(2));
    }

    #[test]
    fn test_reopen_continues_numbering() {
        let dir = tempfile::tempdir().unwrap();
        {
            let dataset = Dataset::open(dir.path()).unwrap();
            dataset.push(&record(1)).unwrap();
            dataset.push(&record(2)).unwrap();
        }

        let dataset = Dataset::open(dir.path()).unwrap();
        let third = dataset.push(&record(3)).unwrap();
        assert_eq!(third.file_name().unwrap(), "000000003.json");
    }

    #[test]
    fn test_purge_clears_store() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Dataset::open(dir.path()).unwrap();
        dataset.push(&record(1)).unwrap();
        dataset.push(&record(2)).unwrap();

        assert_eq!(dataset.purge().unwrap(), 2);
        assert!(dataset.is_empty().unwrap());

        let path = dataset.push(&record(3)).unwrap();
        assert_eq!(path.file_name().unwrap(), "000000001.json");
        assert_eq!(path.parent().unwrap(), dataset.dir());
    }

    #[test]
    fn test_record_files_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("000000002.json"), "{}").unwrap();
        fs::write(dir.path().join("000000001.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join("000000003.json.tmp"), "x").unwrap();

        let files = record_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["000000001.json", "000000002.json"]);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = record_files(&dir.path().join("nope")).unwrap();
        assert!(files.is_empty());
    }
}

//! Local filesystem storage for original and derived image bytes.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::error::{ImageError, Result};
use crate::storage::paths::{clean_relative, resolve_within};

/// Directory holding uploaded originals.
pub const ORIGINALS_DIR: &str = "originals";

// == Storage Areas ==
/// Whitelisted sub-directories for derived files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageArea {
    Thumbnails,
    Variants,
    Temp,
}

impl StorageArea {
    pub const ALL: [StorageArea; 3] = [Self::Thumbnails, Self::Variants, Self::Temp];

    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Thumbnails => "thumbnails",
            Self::Variants => "variants",
            Self::Temp => "temp",
        }
    }
}

impl FromStr for StorageArea {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|area| area.dir_name() == s)
            .ok_or_else(|| ImageError::Validation(format!("invalid storage variant: {s}")))
    }
}

/// Diagnostics snapshot computed by walking the storage tree.
#[derive(Debug, Clone, Serialize)]
pub struct StorageInfo {
    #[serde(rename = "type")]
    pub storage_type: String,
    pub base_path: String,
    pub base_url: String,
    pub max_file_size: u64,
    pub total_size: u64,
    pub file_count: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Outcome of a temp directory sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TempCleanupReport {
    pub removed: usize,
    /// Files that could not be removed, with the reason
    pub failures: Vec<(String, String)>,
}

// == Image Storage ==
/// Path-safe storage rooted at a single base directory.
///
/// Every caller-supplied path is cleaned and re-validated against the
/// canonical root before the filesystem is touched. There is no locking
/// between writers; `store` relies on exclusive create instead.
#[derive(Debug, Clone)]
pub struct ImageStorage {
    base_path: PathBuf,
    base_url: String,
    max_file_size: u64,
}

impl ImageStorage {
    /// Creates the root and its standard sub-directories.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        fs::create_dir_all(&config.base_path)?;
        let base_path = config.base_path.canonicalize()?;

        fs::create_dir_all(base_path.join(ORIGINALS_DIR))?;
        for area in StorageArea::ALL {
            fs::create_dir_all(base_path.join(area.dir_name()))?;
        }

        info!(base_path = %base_path.display(), "image storage ready");

        Ok(Self {
            base_path,
            base_url: config.base_url.clone(),
            max_file_size: config.max_file_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    // == Store ==
    /// Persists an original under `originals/{file_name}`.
    ///
    /// Never overwrites: an existing file yields a validation error.
    /// Returns the path relative to the storage root.
    pub fn store(&self, data: &[u8], file_name: &str) -> Result<String> {
        self.write_new(data, file_name, ORIGINALS_DIR)
    }

    /// Persists a derived file under one of the whitelisted areas.
    pub fn store_variant(&self, data: &[u8], file_name: &str, variant: &str) -> Result<String> {
        let area: StorageArea = variant.parse()?;
        self.write_new(data, file_name, area.dir_name())
    }

    fn write_new(&self, data: &[u8], file_name: &str, dir: &str) -> Result<String> {
        if data.is_empty() {
            return Err(ImageError::Validation("data must not be empty".to_string()));
        }
        if data.len() as u64 > self.max_file_size {
            return Err(ImageError::Validation(format!(
                "file size {} exceeds maximum of {} bytes",
                data.len(),
                self.max_file_size
            )));
        }

        let name = clean_relative(file_name)?;
        let relative = Path::new(dir).join(name);
        let target = resolve_within(&self.base_path, &relative)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(ImageError::Validation(format!(
                    "file already exists: {}",
                    to_slash(&relative)
                )));
            }
            Err(err) => return Err(err.into()),
        };

        if let Err(err) = file.write_all(data).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&target);
            return Err(err.into());
        }

        let relative = to_slash(&relative);
        debug!(path = %relative, bytes = data.len(), "stored file");
        Ok(relative)
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = clean_relative(path)?;
        resolve_within(&self.base_path, &relative)
    }

    // == Retrieve ==
    pub fn retrieve(&self, path: &str) -> Result<Vec<u8>> {
        let target = self.resolve(path)?;
        fs::read(&target).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ImageError::NotFound(format!("file not found: {path}")),
            _ => err.into(),
        })
    }

    // == Delete ==
    /// Removes a file. Deleting a missing file succeeds.
    pub fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target) {
            Ok(()) => {
                debug!(path, "deleted file");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn exists(&self, path: &str) -> Result<bool> {
        let target = self.resolve(path)?;
        Ok(target.is_file())
    }

    // == Copy ==
    /// Streams `src` into `dst`, creating destination directories.
    ///
    /// `dst` must not name the same file as `src`, under any alias.
    /// Returns the number of bytes copied.
    pub fn copy_file(&self, src: &str, dst: &str) -> Result<u64> {
        let source = self.resolve(src)?;
        let dest = self.resolve(dst)?;

        let mut reader = File::open(&source).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ImageError::NotFound(format!("file not found: {src}")),
            _ => err.into(),
        })?;

        if same_file(&source, &dest)? {
            return Err(ImageError::Validation(format!(
                "source and destination are the same file: {src}"
            )));
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = File::create(&dest)?;
        let copied = io::copy(&mut reader, &mut writer)?;
        writer.sync_all()?;

        debug!(src, dst, bytes = copied, "copied file");
        Ok(copied)
    }

    // == Temp Cleanup ==
    /// Deletes files under `temp/` last modified more than `older_than` ago.
    ///
    /// A file that cannot be removed, or a directory that cannot be read, is
    /// recorded in the report and the sweep moves on.
    pub fn cleanup_temp_files(&self, older_than: Duration) -> Result<TempCleanupReport> {
        let temp_dir = self.base_path.join(StorageArea::Temp.dir_name());
        let cutoff = SystemTime::now()
            .checked_sub(older_than)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut report = TempCleanupReport::default();
        if !temp_dir.is_dir() {
            return Ok(report);
        }

        let (files, unreadable) = walk_files(&temp_dir);
        for (path, err) in unreadable {
            warn!(path = %path.display(), error = %err, "failed to inspect temp entry");
            report.failures.push((path.display().to_string(), err.to_string()));
        }

        for (path, meta) in files {
            let stale = meta.modified().map(|m| m < cutoff).unwrap_or(false);
            if !stale {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => report.removed += 1,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to remove temp file");
                    report.failures.push((path.display().to_string(), err.to_string()));
                }
            }
        }

        if report.removed > 0 {
            info!(removed = report.removed, "temp cleanup removed stale files");
        }
        Ok(report)
    }

    // == Storage Info ==
    /// Walks the whole tree. Meant for diagnostics, not the request path.
    pub fn storage_info(&self) -> Result<StorageInfo> {
        let mut total_size = 0u64;
        let mut file_count = 0u64;
        let mut latest: Option<SystemTime> = None;

        let (files, unreadable) = walk_files(&self.base_path);
        for (path, err) in unreadable {
            warn!(path = %path.display(), error = %err, "skipping unreadable storage entry");
        }

        for (_, meta) in files {
            total_size += meta.len();
            file_count += 1;
            if let Ok(modified) = meta.modified() {
                latest = Some(latest.map_or(modified, |l| l.max(modified)));
            }
        }

        Ok(StorageInfo {
            storage_type: "local".to_string(),
            base_path: self.base_path.display().to_string(),
            base_url: self.base_url.clone(),
            max_file_size: self.max_file_size,
            total_size,
            file_count,
            last_modified: latest.map(DateTime::<Utc>::from),
        })
    }

    // == URL ==
    /// Public URL of a stored file, or an empty string when there is none.
    pub fn url(&self, path: &str) -> String {
        let normalized = path.replace('\\', "/");
        if normalized.trim().is_empty() || normalized.starts_with('/') || Path::new(path).is_absolute()
        {
            return String::new();
        }
        let relative = normalized.trim_start_matches("./");
        format!("{}/{}", self.base_url.trim_end_matches('/'), relative)
    }
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

type WalkError = (PathBuf, io::Error);

/// Regular files under `dir`, recursively. Symlinks are not followed.
///
/// Directories or entries that cannot be read are returned alongside the
/// files instead of ending the walk.
fn walk_files(dir: &Path) -> (Vec<(PathBuf, Metadata)>, Vec<WalkError>) {
    let mut files = Vec::new();
    let mut errors = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(err) => {
                errors.push((current, err));
                continue;
            }
        };
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    errors.push((current.clone(), err));
                    continue;
                }
            };
            match entry.metadata() {
                Ok(meta) if meta.is_dir() => pending.push(entry.path()),
                Ok(meta) if meta.is_file() => files.push((entry.path(), meta)),
                Ok(_) => {}
                Err(err) => errors.push((entry.path(), err)),
            }
        }
    }
    (files, errors)
}

/// True when `dest` exists and is the same file as `source`.
fn same_file(source: &Path, dest: &Path) -> io::Result<bool> {
    if source == dest {
        return Ok(true);
    }
    if !dest.exists() {
        return Ok(false);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let (a, b) = (fs::metadata(source)?, fs::metadata(dest)?);
        if a.dev() == b.dev() && a.ino() == b.ino() {
            return Ok(true);
        }
    }

    Ok(fs::canonicalize(source)? == fs::canonicalize(dest)?)
}

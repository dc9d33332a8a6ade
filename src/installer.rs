//! Local copies of an artifact
//!
//! A [`FileTemplate`] describes where an artifact lives on disk. When its file
//! name contains `[[VER]]`, every version gets its own file; otherwise the
//! single file is replaced in place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::manager::{ManagerError, MirrorManager};
use crate::version::Version;

/// Placeholder for the version in a file name
pub const VERSION_PLACEHOLDER: &str = "[[VER]]";

/// Suffix of the backup kept while an unversioned file is replaced
pub const BACKUP_SUFFIX: &str = "old";

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Invalid file template {path}: {reason}")]
    InvalidTemplate { path: String, reason: String },

    #[error("No mirror reported a version")]
    NoVersion,

    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Target path of an artifact, possibly with a `[[VER]]` placeholder
#[derive(Debug, Clone)]
pub struct FileTemplate {
    folder: PathBuf,
    file_name: String,
    local_pattern: Regex,
}

impl FileTemplate {
    /// Whitespace is removed from the file name
    pub fn new(path: impl AsRef<Path>) -> Result<Self, InstallError> {
        let path = path.as_ref();
        let invalid = |reason: &str| InstallError::InvalidTemplate {
            path: path.display().to_string(),
            reason: reason.to_string(),
        };

        let file_name: String = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| invalid("no file name"))?
            .split_whitespace()
            .collect();
        if file_name.is_empty() {
            return Err(invalid("empty file name"));
        }

        let pattern = file_name
            .split(VERSION_PLACEHOLDER)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("(.+)");
        let local_pattern =
            Regex::new(&format!("^{}$", pattern)).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            folder: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            file_name,
            local_pattern,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Whether each version is stored under its own name
    pub fn is_versioned(&self) -> bool {
        self.file_name.contains(VERSION_PLACEHOLDER)
    }

    /// Path for `version`
    pub fn render(&self, version: &Version) -> PathBuf {
        self.folder
            .join(self.file_name.replace(VERSION_PLACEHOLDER, &version.spelling()))
    }

    /// First existing file matching the template, in name order
    pub fn local_file(&self) -> Result<Option<PathBuf>, InstallError> {
        Ok(self.local_files()?.into_iter().next())
    }

    /// Version encoded in the local file name
    pub fn local_version(&self, separator: &str) -> Result<Option<Version>, InstallError> {
        if !self.is_versioned() {
            return Ok(None);
        }
        let Some(local) = self.local_file()? else {
            return Ok(None);
        };

        let name = local.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        Ok(self
            .local_pattern
            .captures(name)
            .and_then(|captures| captures.get(1))
            .and_then(|raw| Version::parse(raw.as_str(), separator, 0).ok()))
    }

    /// True unless the local copy is known to be at least `latest`.
    ///
    /// A local file without a version in its name always counts as outdated.
    pub fn update_available(&self, latest: &Version) -> Result<bool, InstallError> {
        if self.local_file()?.is_none() {
            debug!("No local file for {}", self.file_name);
            return Ok(true);
        }

        let available = match self.local_version(latest.separator())? {
            Some(local) => local < *latest,
            None => true,
        };
        debug!("{}: update to {} available? {}", self.file_name, latest, available);
        Ok(available)
    }

    fn local_files(&self) -> Result<Vec<PathBuf>, InstallError> {
        let folder = if self.folder.as_os_str().is_empty() {
            Path::new(".")
        } else {
            self.folder.as_path()
        };
        let entries = match fs::read_dir(folder) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.local_pattern.is_match(name));
            if matches && entry.file_type()?.is_file() {
                files.push(self.folder.join(entry.file_name()));
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Download the manager's version to the path `template` renders.
///
/// A local file with the same name is kept as `.old` until the new copy is
/// verified and restored if every mirror fails. A local file of another
/// version is removed only after success.
pub async fn install(template: &FileTemplate, manager: &mut MirrorManager) -> Result<PathBuf, InstallError> {
    let version = manager.version().cloned().ok_or(InstallError::NoVersion)?;
    let target = template.render(&version);
    if !template.folder().as_os_str().is_empty() {
        tokio::fs::create_dir_all(template.folder()).await?;
    }

    let local = template.local_file()?;
    let backup = match &local {
        Some(old) if *old == target => {
            let backup = backup_path(old);
            debug!("Moving {} to {}", old.display(), backup.display());
            tokio::fs::rename(old, &backup).await?;
            Some(backup)
        }
        _ => None,
    };

    if let Err(e) = manager.attempt_download(&target).await {
        if let Some(backup) = &backup {
            info!("Restoring {}", target.display());
            tokio::fs::rename(backup, &target).await?;
        }
        return Err(e.into());
    }

    if let Some(backup) = &backup {
        remove_quietly(backup).await;
    }
    if let Some(old) = local.filter(|old| *old != target) {
        info!("Removing previous version {}", old.display());
        remove_quietly(&old).await;
    }
    Ok(target)
}

/// `<path>.old`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}

//! Configuration backups
//!
//! Creation, restoration, and pruning of configuration backups. Backups are
//! .tar.gz archives of the config file stored in a `backups` subdirectory
//! next to it. The persisted file itself stays exclusively owned by
//! [`ConfigStore`](crate::config::ConfigStore); this module only works with
//! the path the store hands out.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::{error, info};

use crate::constants::config::backup::SUBDIR;
use crate::error::{ConfigError, Result};

/// One backup archive on disk
#[derive(Debug, Clone)]
pub struct BackupEntry {
    pub filename: String,
    pub path: PathBuf,
    pub timestamp: SystemTime,
    pub is_manual: bool,
}

pub struct BackupManager {
    config_path: PathBuf,
}

impl BackupManager {
    /// Manager for the config file at the given path
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    fn backup_dir(&self) -> PathBuf {
        let mut path = self.config_path.clone();
        path.pop();
        path.push(SUBDIR);
        path
    }

    fn config_filename(&self) -> Result<&str> {
        self.config_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ConfigError::Persistence(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "config path has no file name",
                ))
            })
    }

    /// Create a backup archive of the config file, named
    /// `[auto|manual]_backup_YYYYMMDD_HHMMSS.tar.gz`
    pub fn create(&self, is_manual: bool) -> Result<PathBuf> {
        let backup_dir = self.backup_dir();
        if !backup_dir.exists() {
            fs::create_dir_all(&backup_dir)?;
        }

        let datetime: chrono::DateTime<chrono::Local> = SystemTime::now().into();
        let timestamp_str = datetime.format("%Y%m%d_%H%M%S").to_string();
        let prefix = if is_manual {
            "manual_backup"
        } else {
            "auto_backup"
        };
        let filename = format!("{prefix}_{timestamp_str}.tar.gz");
        let backup_path = backup_dir.join(&filename);

        let tar_gz = fs::File::create(&backup_path)?;
        let enc = GzEncoder::new(tar_gz, Compression::default());
        let mut tar = tar::Builder::new(enc);

        let mut config_file = fs::File::open(&self.config_path)?;
        tar.append_file(self.config_filename()?, &mut config_file)?;
        tar.finish()?;

        info!(path = %backup_path.display(), "Created backup");
        Ok(backup_path)
    }

    /// All available backups, newest first
    pub fn list(&self) -> Result<Vec<BackupEntry>> {
        let backup_dir = self.backup_dir();
        if !backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for entry in fs::read_dir(backup_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("gz") {
                let metadata = fs::metadata(&path)?;
                let timestamp = metadata.modified().unwrap_or_else(|_| SystemTime::now());
                let filename = entry.file_name().to_string_lossy().to_string();
                let is_manual = filename.starts_with("manual");

                backups.push(BackupEntry {
                    filename,
                    path,
                    timestamp,
                    is_manual,
                });
            }
        }

        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }

    /// Restore the config file from a specific backup archive. The caller
    /// should reload its store afterwards.
    pub fn restore(&self, filename: &str) -> Result<()> {
        let backup_path = self.backup_dir().join(filename);
        if !backup_path.exists() {
            return Err(ConfigError::Persistence(io::Error::new(
                io::ErrorKind::NotFound,
                format!("backup file not found: {filename}"),
            )));
        }

        let tar_gz = fs::File::open(&backup_path)?;
        let dec = GzDecoder::new(tar_gz);
        let mut archive = tar::Archive::new(dec);

        let config_dir = self.config_path.parent().ok_or_else(|| {
            ConfigError::Persistence(io::Error::new(
                io::ErrorKind::InvalidInput,
                "config path has no parent directory",
            ))
        })?;
        archive.unpack(config_dir)?;

        info!(filename = %filename, "Restored backup");
        Ok(())
    }

    /// Delete a specific backup archive
    pub fn delete(&self, filename: &str) -> Result<()> {
        let backup_path = self.backup_dir().join(filename);
        if backup_path.exists() {
            fs::remove_file(&backup_path)?;
            info!(filename = %filename, "Deleted backup");
        }
        Ok(())
    }

    /// Prune old automatic backups down to `retention_count`; manual
    /// backups are never pruned.
    pub fn prune(&self, retention_count: u32) -> Result<()> {
        let backups = self.list()?;
        let auto_backups: Vec<&BackupEntry> = backups.iter().filter(|b| !b.is_manual).collect();

        if auto_backups.len() > retention_count as usize {
            for backup in &auto_backups[retention_count as usize..] {
                if let Err(e) = fs::remove_file(&backup.path) {
                    error!(path = %backup.path.display(), error = %e, "Failed to prune backup");
                } else {
                    info!(filename = %backup.filename, "Pruned old backup");
                }
            }
        }
        Ok(())
    }

    /// Prune with the default retention policy
    pub fn prune_default(&self) -> Result<()> {
        self.prune(crate::constants::config::backup::RETENTION)
    }

    /// Whether an automatic backup is due; `interval_days == 0` disables
    /// automatic backups.
    pub fn auto_backup_due(&self, interval_days: u32) -> bool {
        if interval_days == 0 {
            return false;
        }

        let backups = match self.list() {
            Ok(backups) => backups,
            Err(_) => return true,
        };

        match backups.iter().find(|b| !b.is_manual) {
            Some(newest_auto) => match SystemTime::now().duration_since(newest_auto.timestamp) {
                Ok(duration) => duration.as_secs() / 86400 >= u64::from(interval_days),
                // Clock moved backwards; run a backup rather than skip
                Err(_) => true,
            },
            None => true,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

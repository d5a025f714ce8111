use std::path::{Path, PathBuf};

use chrono::DateTime;
use chrono_tz::Tz;

use crate::error::AppResult;

/// Writes the plain-text backup copy of each report.
#[derive(Debug, Clone)]
pub struct BackupWriter {
    dir: PathBuf,
}

impl BackupWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn default_file_name(at: DateTime<Tz>) -> String {
        format!("pelangi_report_{}.txt", at.format("%Y%m%d_%H%M%S"))
    }

    /// Saves `report` to `path`, or to a timestamped file in the backup
    /// directory when no path is given. The content lands in a temporary
    /// sibling first and is renamed into place.
    #[tracing::instrument(name = "delivery backup", skip(self, report))]
    pub async fn save(&self, report: &str, path: Option<&Path>) -> AppResult<PathBuf> {
        let target = match path {
            Some(path) => path.to_path_buf(),
            None => self
                .dir
                .join(Self::default_file_name(crate::report_now())),
        };

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut staging = target.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        tokio::fs::write(&staging, report.as_bytes()).await?;
        tokio::fs::rename(&staging, &target).await?;

        tracing::info!(path = %target.display(), bytes = report.len(), "Report backup saved");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_file_name() {
        let at = chrono_tz::Asia::Kuala_Lumpur
            .with_ymd_and_hms(2026, 10, 17, 9, 0, 5)
            .unwrap();
        assert_eq!(
            BackupWriter::default_file_name(at),
            "pelangi_report_20261017_090005.txt"
        );
    }

    #[tokio::test]
    async fn test_save_to_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let writer = BackupWriter::new(dir.path());

        let path = writer.save("hello ✅", None).await.unwrap();

        assert_eq!(path.parent().unwrap(), dir.path());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("pelangi_report_"));
        assert!(name.ends_with(".txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello ✅");

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "no staging file should remain");
    }

    #[tokio::test]
    async fn test_save_explicit_path_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let writer = BackupWriter::new(dir.path());
        let target = dir.path().join("nested").join("report.txt");

        writer.save("first", Some(&target)).await.unwrap();
        let path = writer.save("second", Some(&target)).await.unwrap();

        assert_eq!(path, target);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "second");
    }
}

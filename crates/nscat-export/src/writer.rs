//! Partitioning of merged records and one CSV file per group.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use nscat_core::{ExportLayout, MergedRecord};
use regex::Regex;

use crate::error::ExportError;
use crate::layout::{header, row};

static NON_ALNUM_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("valid file-name regex"));

/// `brand_<name>.csv`, every run of non-alphanumerics in `name` becoming `_`.
#[must_use]
pub fn brand_file_name(group: &str) -> String {
    format!("brand_{}.csv", NON_ALNUM_RUN.replace_all(group, "_"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub group: String,
    pub path: PathBuf,
    /// Data rows, header excluded.
    pub rows: usize,
}

#[derive(Debug)]
pub struct ExportFailure {
    pub group: String,
    pub error: ExportError,
}

/// Files written by one export, plus the groups that could not be written.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub files: Vec<ExportedFile>,
    pub failures: Vec<ExportFailure>,
}

impl ExportReport {
    #[must_use]
    pub fn paths(&self) -> Vec<&Path> {
        self.files.iter().map(|f| f.path.as_path()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Exporter {
    csv_dir: PathBuf,
    layout: ExportLayout,
}

impl Exporter {
    #[must_use]
    pub fn new(csv_dir: impl Into<PathBuf>, layout: ExportLayout) -> Self {
        Self {
            csv_dir: csv_dir.into(),
            layout,
        }
    }

    /// Writes one CSV per entry of `groups`, header-only when no record
    /// belongs to it. `belongs(record, group)` decides membership.
    ///
    /// Directory and file errors are logged and recorded per group; the
    /// remaining groups are still written.
    pub fn export_by_group<F>(&self, records: &[MergedRecord], groups: &[String], belongs: F) -> ExportReport
    where
        F: Fn(&MergedRecord, &str) -> bool,
    {
        let mut report = ExportReport::default();

        if let Err(source) = std::fs::create_dir_all(&self.csv_dir) {
            let path = self.csv_dir.clone();
            tracing::error!(path = %path.display(), error = %source, "cannot create CSV directory");
            for group in groups {
                report.failures.push(ExportFailure {
                    group: group.clone(),
                    error: ExportError::CreateDir {
                        path: path.clone(),
                        source: std::io::Error::new(source.kind(), source.to_string()),
                    },
                });
            }
            return report;
        }

        for group in groups {
            let members: Vec<&MergedRecord> = records.iter().filter(|r| belongs(r, group.as_str())).collect();

            let path = self.csv_dir.join(brand_file_name(group));
            match self.write_group(&path, &members) {
                Ok(()) => {
                    tracing::info!(group = %group, path = %path.display(), rows = members.len(), "CSV written");
                    report.files.push(ExportedFile {
                        group: group.clone(),
                        path,
                        rows: members.len(),
                    });
                }
                Err(error) => {
                    tracing::error!(group = %group, error = %error, "CSV group skipped");
                    report.failures.push(ExportFailure {
                        group: group.clone(),
                        error,
                    });
                }
            }
        }
        report
    }

    /// Partitions by manufacturer, ignoring case and surrounding whitespace.
    pub fn export_by_manufacturer(&self, records: &[MergedRecord], manufacturers: &[String]) -> ExportReport {
        self.export_by_group(records, manufacturers, MergedRecord::is_manufactured_by)
    }

    fn write_group(&self, path: &Path, members: &[&MergedRecord]) -> Result<(), ExportError> {
        let write_err = |source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::Writer::from_path(path).map_err(write_err)?;
        writer.write_record(header(self.layout)).map_err(write_err)?;
        for record in members {
            writer
                .write_record(row(record, self.layout))
                .map_err(write_err)?;
        }
        writer
            .flush()
            .map_err(|e| write_err(csv::Error::from(e)))?;
        Ok(())
    }
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{CheckError, CheckResult};
use crate::report::{Renderer, Report};
use crate::threshold::AggregateResult;

/// Where a finished report ends up.
pub trait ReportSink {
    /// Render and store the report, returning the artifact path if one was written.
    fn publish(
        &self,
        report: &Report,
        aggregate: &AggregateResult,
    ) -> CheckResult<Option<PathBuf>>;
}

/// Discards reports, for `--no-report`.
pub struct NullSink;

impl ReportSink for NullSink {
    fn publish(&self, _: &Report, _: &AggregateResult) -> CheckResult<Option<PathBuf>> {
        Ok(None)
    }
}

/// Writes dated artifacts below a base directory:
///
/// ```text
/// <base>/<OK|FAILURE>/<label>/<YYYY-MM-DD>/<label>-<YYYYmmddTHHMMSS>.<ext>
/// <base>/<label>-latest.<ext> -> most recent artifact of <label>
/// ```
pub struct FileSink {
    base_dir: PathBuf,
    renderer: Renderer,
}

impl FileSink {
    pub fn new(base_dir: impl Into<PathBuf>, renderer: Renderer) -> Self {
        Self {
            base_dir: base_dir.into(),
            renderer,
        }
    }

    /// Artifact path relative to the base directory.
    pub fn relative_path(&self, report: &Report, aggregate: &AggregateResult) -> PathBuf {
        let meta = &report.metadata;
        let classification = if aggregate.is_clean() { "OK" } else { "FAILURE" };
        let file_name = format!(
            "{}-{}.{}",
            meta.source_label,
            meta.started_at.format("%Y%m%dT%H%M%S"),
            self.renderer.extension()
        );

        PathBuf::from(classification)
            .join(&meta.source_label)
            .join(meta.started_at.format("%Y-%m-%d").to_string())
            .join(file_name)
    }

    pub fn latest_path(&self, report: &Report) -> PathBuf {
        self.base_dir.join(format!(
            "{}-latest.{}",
            report.metadata.source_label,
            self.renderer.extension()
        ))
    }
}

impl ReportSink for FileSink {
    fn publish(
        &self,
        report: &Report,
        aggregate: &AggregateResult,
    ) -> CheckResult<Option<PathBuf>> {
        let document = self.renderer.render(report)?;
        let relative = self.relative_path(report, aggregate);
        let path = self.base_dir.join(&relative);

        write_atomically(&path, document.as_bytes()).map_err(|source| CheckError::Persist {
            path: path.clone(),
            source,
        })?;
        info!("Wrote report to {}", path.display());

        let latest = self.latest_path(report);
        if let Err(e) = replace_pointer(&latest, &relative) {
            warn!("Failed to update {}: {}", latest.display(), e);
        }

        Ok(Some(path))
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

/// Point `pointer` at `target` (relative to the pointer's directory),
/// removing whatever was there before.
fn replace_pointer(pointer: &Path, target: &Path) -> io::Result<()> {
    match fs::symlink_metadata(pointer) {
        Ok(_) => fs::remove_file(pointer)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    link(pointer, target)
}

#[cfg(unix)]
fn link(pointer: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, pointer)
}

#[cfg(not(unix))]
fn link(pointer: &Path, target: &Path) -> io::Result<()> {
    let source = pointer.parent().unwrap_or(Path::new(".")).join(target);
    fs::copy(source, pointer).map(|_| ())
}

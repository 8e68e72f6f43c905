//! Identifier-scoped workspace for a single conversion job.
//!
//! A [`JobWorkspace`] owns two locations derived from a [`JobId`]:
//!
//! - a private temporary directory under the configured temp root that holds
//!   the downloaded input file, and
//! - an output directory `<public_root>/<id>/` that ffmpeg writes the
//!   manifest and segments into and that is served statically.
//!
//! Release is unconditional. Dropping the workspace always removes the input,
//! and removes the output directory too unless the job was committed.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vr_core::JobId;

/// File name of the HLS manifest inside a job's output directory.
pub const MANIFEST_NAME: &str = "stream.m3u8";

/// File name of the downloaded input inside the job's temp directory.
const INPUT_NAME: &str = "source";

/// Workspace for one conversion job.
///
/// # Example
///
/// ```no_run
/// use vr_av::JobWorkspace;
/// use vr_core::JobId;
/// use std::path::Path;
///
/// let ws = JobWorkspace::allocate(JobId::new(), Path::new("/tmp/vr"), Path::new("/srv/www")).unwrap();
/// // ... download into ws.input(), run ffmpeg into ws.output_dir() ...
/// let manifest = ws.commit().unwrap();
/// ```
#[derive(Debug)]
pub struct JobWorkspace {
    id: JobId,
    temp_dir: Option<TempDir>,
    output_dir: PathBuf,
    keep_output: bool,
}

impl JobWorkspace {
    /// Create the temp and output locations for `id`.
    ///
    /// Both roots are created if missing. The output directory must not exist
    /// yet; an existing directory means an identifier collision and is an
    /// error rather than a silent overwrite.
    pub fn allocate(id: JobId, temp_root: &Path, public_root: &Path) -> vr_core::Result<Self> {
        std::fs::create_dir_all(temp_root)?;
        std::fs::create_dir_all(public_root)?;

        let temp_dir = tempfile::Builder::new()
            .prefix(&format!("{id}-"))
            .tempdir_in(temp_root)
            .map_err(|e| {
                vr_core::Error::Internal(format!(
                    "failed to create temp dir in {}: {e}",
                    temp_root.display()
                ))
            })?;

        let output_dir = public_root.join(id.to_string());
        std::fs::create_dir(&output_dir).map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => vr_core::Error::Internal(format!(
                "output directory already exists: {}",
                output_dir.display()
            )),
            _ => vr_core::Error::from(e),
        })?;

        tracing::debug!(job_id = %id, temp = ?temp_dir.path(), output = ?output_dir, "Workspace allocated");

        Ok(Self {
            id,
            temp_dir: Some(temp_dir),
            output_dir,
            keep_output: false,
        })
    }

    /// The job identifier this workspace is scoped to.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Path of the downloaded input file.
    pub fn input(&self) -> PathBuf {
        self.temp_dir().join(INPUT_NAME)
    }

    /// Path to the job's private temporary directory.
    pub fn temp_dir(&self) -> &Path {
        // Only taken in Drop.
        self.temp_dir
            .as_ref()
            .map(TempDir::path)
            .unwrap_or_else(|| Path::new(""))
    }

    /// Output directory served at `/<id>/`.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Filesystem path of the manifest ffmpeg is told to write.
    pub fn manifest(&self) -> PathBuf {
        self.output_dir.join(MANIFEST_NAME)
    }

    /// Public URL path of the manifest, relative to the site root.
    pub fn public_manifest_path(&self) -> String {
        format!("/{}/{MANIFEST_NAME}", self.id)
    }

    /// Keep the output directory and release the input.
    ///
    /// Returns the manifest path. Fails, and removes the output directory,
    /// if no manifest was written.
    pub fn commit(mut self) -> vr_core::Result<PathBuf> {
        let manifest = self.manifest();
        if !manifest.is_file() {
            return Err(vr_core::Error::tool(
                "ffmpeg",
                format!("manifest was not written: {}", manifest.display()),
            ));
        }
        self.keep_output = true;
        Ok(manifest)
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if let Some(temp_dir) = self.temp_dir.take() {
            let path = temp_dir.path().to_path_buf();
            if let Err(e) = temp_dir.close() {
                tracing::warn!(job_id = %self.id, path = ?path, "Failed to remove job input: {e}");
            }
        }

        if !self.keep_output {
            match std::fs::remove_dir_all(&self.output_dir) {
                Ok(()) => {
                    tracing::debug!(job_id = %self.id, "Removed uncommitted output directory");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        job_id = %self.id,
                        path = ?self.output_dir,
                        "Failed to remove output directory: {e}"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn roots() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let base = tempfile::tempdir().unwrap();
        let temp_root = base.path().join("tmp");
        let public_root = base.path().join("public");
        (base, temp_root, public_root)
    }

    #[test]
    fn workspace_paths() {
        let (_base, temp_root, public_root) = roots();
        let id = JobId::new();
        let ws = JobWorkspace::allocate(id, &temp_root, &public_root).unwrap();

        assert_eq!(ws.id(), id);
        assert!(ws.input().starts_with(&temp_root));
        assert!(ws.temp_dir().is_dir());
        assert_eq!(ws.output_dir(), public_root.join(id.to_string()));
        assert!(ws.output_dir().is_dir());
        assert_eq!(ws.manifest(), ws.output_dir().join("stream.m3u8"));
        assert_eq!(ws.public_manifest_path(), format!("/{id}/stream.m3u8"));
    }

    #[test]
    fn drop_without_commit_removes_everything() {
        let (_base, temp_root, public_root) = roots();
        let ws = JobWorkspace::allocate(JobId::new(), &temp_root, &public_root).unwrap();
        fs::write(ws.input(), b"media").unwrap();
        fs::write(ws.output_dir().join("segment000.ts"), b"partial").unwrap();
        let input = ws.input();
        let output = ws.output_dir().to_path_buf();

        drop(ws);

        assert!(!input.exists());
        assert!(!output.exists());
        assert_eq!(fs::read_dir(&temp_root).unwrap().count(), 0);
        assert_eq!(fs::read_dir(&public_root).unwrap().count(), 0);
    }

    #[test]
    fn commit_keeps_output_and_removes_input() {
        let (_base, temp_root, public_root) = roots();
        let ws = JobWorkspace::allocate(JobId::new(), &temp_root, &public_root).unwrap();
        fs::write(ws.input(), b"media").unwrap();
        fs::write(ws.manifest(), b"#EXTM3U\n").unwrap();
        let input = ws.input();

        let manifest = ws.commit().unwrap();

        assert!(manifest.is_file());
        assert!(!input.exists());
        assert_eq!(fs::read_dir(&temp_root).unwrap().count(), 0);
    }

    #[test]
    fn commit_without_manifest_fails_and_cleans_up() {
        let (_base, temp_root, public_root) = roots();
        let ws = JobWorkspace::allocate(JobId::new(), &temp_root, &public_root).unwrap();
        let output = ws.output_dir().to_path_buf();

        let err = ws.commit().unwrap_err();

        assert!(err.to_string().contains("manifest was not written"));
        assert!(!output.exists());
    }

    #[test]
    fn existing_output_directory_is_a_collision() {
        let (_base, temp_root, public_root) = roots();
        let id = JobId::new();
        fs::create_dir_all(public_root.join(id.to_string())).unwrap();

        let err = JobWorkspace::allocate(id, &temp_root, &public_root).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        // The pre-existing directory belongs to someone else and must survive.
        assert!(public_root.join(id.to_string()).is_dir());
    }

    #[test]
    fn distinct_ids_get_distinct_directories() {
        let (_base, temp_root, public_root) = roots();
        let a = JobWorkspace::allocate(JobId::new(), &temp_root, &public_root).unwrap();
        let b = JobWorkspace::allocate(JobId::new(), &temp_root, &public_root).unwrap();
        assert_ne!(a.output_dir(), b.output_dir());
        assert_ne!(a.temp_dir(), b.temp_dir());
    }
}

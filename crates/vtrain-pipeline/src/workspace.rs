//! Per-job temporary files.
//!
//! A [`JobWorkspace`] owns the job's video file and frame directory. Calling
//! [`JobWorkspace::cleanup`] consumes it; a workspace dropped without cleanup
//! (early return, panic) removes the same paths synchronously.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use vtrain_models::JobId;

const DEFAULT_EXTENSION: &str = ".mp4";

/// Normalise a user-supplied extension to `.ext`, defaulting to `.mp4`.
pub fn normalize_extension(extension: Option<&str>) -> String {
    extension
        .map(|e| e.trim().trim_start_matches('.'))
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

#[derive(Debug)]
pub struct JobWorkspace {
    job_id: JobId,
    video_path: PathBuf,
    frames_dir: PathBuf,
    cleaned: bool,
}

impl JobWorkspace {
    /// Reserve `<upload_dir>/<job_id><ext>` and create `<frames_root>/<job_id>/`.
    pub async fn create(
        upload_dir: &Path,
        frames_root: &Path,
        job_id: JobId,
        extension: &str,
    ) -> io::Result<Self> {
        let video_path = upload_dir.join(format!("{}{}", job_id, extension));
        let frames_dir = frames_root.join(job_id.as_str());

        tokio::fs::create_dir_all(upload_dir).await?;

        let workspace = Self {
            job_id,
            video_path,
            frames_dir,
            cleaned: false,
        };
        tokio::fs::create_dir_all(&workspace.frames_dir).await?;

        debug!(job_id = %workspace.job_id, "Created job workspace");
        Ok(workspace)
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }

    /// Stored name of the video, `<job_id><ext>`.
    pub fn video_filename(&self) -> String {
        self.video_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Remove the video file and frame directory.
    pub async fn cleanup(mut self) {
        self.cleaned = true;

        if let Err(e) = tokio::fs::remove_file(&self.video_path).await {
            log_removal_error(&self.video_path, e);
        }
        if let Err(e) = tokio::fs::remove_dir_all(&self.frames_dir).await {
            log_removal_error(&self.frames_dir, e);
        }

        debug!(job_id = %self.job_id, "Cleaned up job workspace");
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }

        warn!(job_id = %self.job_id, "Job workspace dropped without cleanup, removing files");
        if let Err(e) = std::fs::remove_file(&self.video_path) {
            log_removal_error(&self.video_path, e);
        }
        if let Err(e) = std::fs::remove_dir_all(&self.frames_dir) {
            log_removal_error(&self.frames_dir, e);
        }
    }
}

fn log_removal_error(path: &Path, error: io::Error) {
    if error.kind() != io::ErrorKind::NotFound {
        warn!("Failed to remove {}: {}", path.display(), error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn workspace_in(dir: &TempDir) -> JobWorkspace {
        JobWorkspace::create(
            &dir.path().join("uploads"),
            &dir.path().join("frames"),
            JobId::from_string("job-1"),
            ".mp4",
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension(Some("MOV")), ".mov");
        assert_eq!(normalize_extension(Some(".webm")), ".webm");
        assert_eq!(normalize_extension(Some("../x")), ".mp4");
        assert_eq!(normalize_extension(Some("")), ".mp4");
        assert_eq!(normalize_extension(None), ".mp4");
    }

    #[tokio::test]
    async fn test_layout() {
        let dir = TempDir::new().unwrap();
        let workspace = workspace_in(&dir).await;

        assert_eq!(workspace.video_path(), dir.path().join("uploads").join("job-1.mp4"));
        assert_eq!(workspace.video_filename(), "job-1.mp4");
        assert!(workspace.frames_dir().is_dir());
        workspace.cleanup().await;
    }

    #[tokio::test]
    async fn test_cleanup_removes_files() {
        let dir = TempDir::new().unwrap();
        let workspace = workspace_in(&dir).await;
        tokio::fs::write(workspace.video_path(), b"video").await.unwrap();
        tokio::fs::write(workspace.frames_dir().join("frame_0001.jpg"), b"x").await.unwrap();

        let video = workspace.video_path().to_path_buf();
        let frames = workspace.frames_dir().to_path_buf();
        workspace.cleanup().await;

        assert!(!video.exists());
        assert!(!frames.exists());
        assert!(dir.path().join("uploads").is_dir());
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_missing_video() {
        let dir = TempDir::new().unwrap();
        let workspace = workspace_in(&dir).await;
        let frames = workspace.frames_dir().to_path_buf();

        workspace.cleanup().await;
        assert!(!frames.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_files() {
        let dir = TempDir::new().unwrap();
        let workspace = workspace_in(&dir).await;
        tokio::fs::write(workspace.video_path(), b"video").await.unwrap();
        let video = workspace.video_path().to_path_buf();
        let frames = workspace.frames_dir().to_path_buf();

        drop(workspace);

        assert!(!video.exists());
        assert!(!frames.exists());
    }
}

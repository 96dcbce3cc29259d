use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Camera access denied: {0}")]
    PermissionDenied(String),
    #[error("No camera available: {0}")]
    NoDevice(String),
    #[error("Frame capture failed: {0}")]
    Capture(String),
    #[error("Camera stream already released")]
    Released,
}

impl CameraError {
    /// Short message shown in place of the camera feed.
    pub fn user_message(&self) -> &'static str {
        match self {
            CameraError::PermissionDenied(_) => "Camera access denied",
            CameraError::NoDevice(_) => "No camera found",
            CameraError::Capture(_) | CameraError::Released => "Camera unavailable",
        }
    }
}

/// Source of a live camera stream.
#[async_trait]
pub trait Camera: Send {
    /// Open the device. Fails on permission denial or a missing device.
    async fn acquire(&mut self) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// An acquired camera stream.
///
/// Implementations must release the device when dropped, so a stream can
/// never outlive its owner even if `release` is not called.
#[async_trait]
pub trait CameraStream: Send {
    /// True once at least one frame has been decoded.
    fn is_ready(&self) -> bool;

    /// Grab the current frame as JPEG bytes.
    async fn capture_jpeg(&mut self) -> Result<Vec<u8>, CameraError>;

    /// Stop all tracks. Idempotent.
    fn release(&mut self);

    fn is_released(&self) -> bool;
}

/// Replays the JPEG files of a directory, in name order, as a camera feed.
pub struct DirectoryCamera {
    dir: PathBuf,
}

impl DirectoryCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

fn open_error(dir: &Path, err: std::io::Error) -> CameraError {
    match err.kind() {
        ErrorKind::PermissionDenied => CameraError::PermissionDenied(dir.display().to_string()),
        _ => CameraError::NoDevice(format!("{}: {}", dir.display(), err)),
    }
}

#[async_trait]
impl Camera for DirectoryCamera {
    async fn acquire(&mut self) -> Result<Box<dyn CameraStream>, CameraError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| open_error(&self.dir, e))?;

        let mut frames = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| open_error(&self.dir, e))?
        {
            let path = entry.path();
            if is_jpeg(&path) {
                frames.push(path);
            }
        }

        if frames.is_empty() {
            return Err(CameraError::NoDevice(format!(
                "no JPEG frames in {}",
                self.dir.display()
            )));
        }
        frames.sort();

        info!(
            "Camera opened: {} ({} frames)",
            self.dir.display(),
            frames.len()
        );
        Ok(Box::new(DirectoryStream {
            frames,
            next: 0,
            released: false,
        }))
    }
}

struct DirectoryStream {
    frames: Vec<PathBuf>,
    next: usize,
    released: bool,
}

#[async_trait]
impl CameraStream for DirectoryStream {
    fn is_ready(&self) -> bool {
        !self.released && !self.frames.is_empty()
    }

    async fn capture_jpeg(&mut self) -> Result<Vec<u8>, CameraError> {
        if self.released {
            return Err(CameraError::Released);
        }
        let path = &self.frames[self.next];
        self.next = (self.next + 1) % self.frames.len();

        debug!("Capturing frame {}", path.display());
        tokio::fs::read(path)
            .await
            .map_err(|e| CameraError::Capture(format!("{}: {}", path.display(), e)))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            info!("Camera stream released");
        }
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for DirectoryStream {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_directory_is_no_device() {
        let mut camera = DirectoryCamera::new("/definitely/not/here");
        let err = camera.acquire().await.err().unwrap();
        assert!(matches!(err, CameraError::NoDevice(_)));
        assert_eq!(err.user_message(), "No camera found");
    }

    #[tokio::test]
    async fn frames_cycle_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.jpg"), b"second").unwrap();
        std::fs::write(dir.path().join("a.JPEG"), b"first").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let mut camera = DirectoryCamera::new(dir.path());
        let mut stream = camera.acquire().await.unwrap();
        assert!(stream.is_ready());
        assert_eq!(stream.capture_jpeg().await.unwrap(), b"first");
        assert_eq!(stream.capture_jpeg().await.unwrap(), b"second");
        assert_eq!(stream.capture_jpeg().await.unwrap(), b"first");

        stream.release();
        assert!(stream.is_released());
        assert!(!stream.is_ready());
        assert!(matches!(
            stream.capture_jpeg().await,
            Err(CameraError::Released)
        ));
    }

    #[tokio::test]
    async fn directory_without_frames_is_no_device() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = DirectoryCamera::new(dir.path());
        assert!(matches!(
            camera.acquire().await,
            Err(CameraError::NoDevice(_))
        ));
    }
}

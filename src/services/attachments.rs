use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
};
use async_trait::async_trait;
use metrics::counter;
use std::{
    ffi::OsStr,
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Sub-directory of the upload root holding payment proofs.
pub const PAYMENT_PROOF_DIR: &str = "payment-proofs";

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "pdf"];

/// A file received from a client, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(OsStr::to_str)
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// Durable storage for checkout attachments.
#[async_trait]
pub trait AttachmentWriter: Send + Sync {
    /// Persists `file` and returns its path relative to the storage root.
    async fn store(
        &self,
        customer_id: &str,
        label: &str,
        file: UploadedFile,
    ) -> Result<String, ServiceError>;

    /// Removes a stored file. Missing files are not an error.
    async fn delete(&self, path: &str) -> Result<(), ServiceError>;
}

/// Writes attachments below a local directory that is also served at `/uploads`.
#[derive(Debug, Clone)]
pub struct LocalAttachmentStore {
    root: PathBuf,
    max_bytes: usize,
}

impl LocalAttachmentStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a stored relative path onto the filesystem, refusing anything
    /// that could leave the root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, ServiceError> {
        let path = Path::new(relative);
        let contained = !relative.is_empty()
            && path
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !contained {
            return Err(ServiceError::InvalidArgument(format!(
                "Attachment path {} is outside the upload root",
                relative
            )));
        }
        Ok(self.root.join(path))
    }
}

fn safe_segment(value: &str, what: &str) -> Result<(), ServiceError> {
    let ok = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(ServiceError::InvalidArgument(format!(
            "{} contains unsupported characters",
            what
        )))
    }
}

#[async_trait]
impl AttachmentWriter for LocalAttachmentStore {
    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    async fn store(
        &self,
        customer_id: &str,
        label: &str,
        file: UploadedFile,
    ) -> Result<String, ServiceError> {
        safe_segment(customer_id, "Customer id")?;
        safe_segment(label, "Attachment label")?;

        if file.bytes.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "Attachment is empty".to_string(),
            ));
        }
        if file.bytes.len() > self.max_bytes {
            return Err(ServiceError::InvalidArgument(format!(
                "Attachment exceeds the {} byte limit",
                self.max_bytes
            )));
        }

        let extension = file
            .extension()
            .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(|| {
                ServiceError::InvalidArgument(format!(
                    "Attachment type not allowed; expected one of {}",
                    ALLOWED_EXTENSIONS.join(", ")
                ))
            })?;

        let relative = format!(
            "{}/{}/{}-{}.{}",
            PAYMENT_PROOF_DIR,
            customer_id,
            label,
            Uuid::new_v4(),
            extension
        );
        let target = self.resolve(&relative)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                error!(dir = %parent.display(), error = %e, "failed to create upload directory");
                ServiceError::StorageFailure(format!("Failed to prepare upload directory: {}", e))
            })?;
        }
        tokio::fs::write(&target, &file.bytes).await.map_err(|e| {
            error!(path = %target.display(), error = %e, "failed to write attachment");
            ServiceError::StorageFailure(format!("Failed to write attachment: {}", e))
        })?;

        debug!(path = %relative, "attachment stored");
        Ok(relative)
    }

    async fn delete(&self, path: &str) -> Result<(), ServiceError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::StorageFailure(format!(
                "Failed to delete attachment {}: {}",
                path, e
            ))),
        }
    }
}

/// Deletes an attachment whose transaction rolled back.
///
/// Runs detached from the caller; a failed delete is logged and never
/// replaces the caller's error.
pub fn compensate(
    writer: Arc<dyn AttachmentWriter>,
    path: String,
    event_sender: Arc<EventSender>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match writer.delete(&path).await {
            Ok(()) => {
                counter!("storefront.attachment.compensated", 1);
                info!(%path, "compensated orphaned attachment");
                event_sender
                    .send_or_log(Event::AttachmentCompensated(path))
                    .await;
            }
            Err(e) => {
                counter!("storefront.attachment.compensation_failed", 1);
                error!(%path, error = %e, "failed to compensate attachment");
            }
        }
    })
}

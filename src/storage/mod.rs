// Upload staging: multipart uploads land in `temp/` under a generated name
// and are moved into `uploads/{event}/{post}/` when a post references them.
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the `public/`, `uploads/` and `temp/` trees.
    pub fn init(&self) -> AppResult<()> {
        for dir in [self.public_dir(), self.uploads_dir(), self.temp_dir()] {
            std::fs::create_dir_all(&dir)
                .map_err(|e| AppError::Internal(format!("could not create {:?}: {}", dir, e)))?;
        }
        tracing::info!("Storage initialized at {}", self.root.display());
        Ok(())
    }

    pub fn public_dir(&self) -> PathBuf {
        self.root.join("public")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    /// Store uploaded bytes under `temp/{uuid}.{ext}`, preserving the
    /// original extension. Returns the generated file name, which doubles as
    /// the temp id handed back to the client.
    pub fn save_temp(&self, bytes: &[u8], original_name: &str) -> AppResult<String> {
        let file_id = uuid::Uuid::new_v4();
        let name = match extension_of(original_name) {
            Some(ext) => format!("{}.{}", file_id, ext),
            None => file_id.to_string(),
        };

        let path = self.temp_dir().join(&name);
        std::fs::write(&path, bytes)
            .map_err(|e| AppError::Internal(format!("could not write temp file: {}", e)))?;

        Ok(name)
    }

    /// Move a staged temp file into its permanent home under
    /// `uploads/{event_id}/{post_id}/` and return the public path. The file
    /// is located by prefix so a client may pass the bare temp id with the
    /// extension it was told about.
    ///
    /// Not transactional with the post_media insert: a crash after the move
    /// but before commit leaves an orphaned file behind.
    pub fn stage(&self, temp_name: &str, event_id: &str, post_id: &str) -> AppResult<String> {
        let temp_name = sanitize_name(temp_name)?;
        if extension_of(temp_name).is_none() {
            return Err(AppError::NotFound(format!("Temp file not found: {}", temp_name)));
        }

        let source = self.find_temp_by_prefix(temp_name)?;

        let dest_dir = self.uploads_dir().join(event_id).join(post_id);
        std::fs::create_dir_all(&dest_dir)
            .map_err(|e| AppError::Internal(format!("could not create media dir: {}", e)))?;

        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::Internal("temp file has no name".to_string()))?
            .to_string();
        let dest = dest_dir.join(&file_name);
        std::fs::rename(&source, &dest)
            .map_err(|e| AppError::Internal(format!("could not move temp file: {}", e)))?;

        Ok(format!("/uploads/{}/{}/{}", event_id, post_id, file_name))
    }

    fn find_temp_by_prefix(&self, prefix: &str) -> AppResult<PathBuf> {
        let entries = std::fs::read_dir(self.temp_dir())
            .map_err(|e| AppError::Internal(format!("could not read temp dir: {}", e)))?;

        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(prefix) {
                    return Ok(entry.path());
                }
            }
        }
        Err(AppError::NotFound(format!("Temp file not found: {}", prefix)))
    }
}

fn extension_of(name: &str) -> Option<&str> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
}

/// Temp names come from clients; anything that is not a plain file name
/// (path separators, parent refs) is rejected.
fn sanitize_name(name: &str) -> AppResult<&str> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(AppError::BadRequest("Invalid media ID format".to_string()));
    }
    Ok(name)
}

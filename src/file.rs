//! Certificate and profile photo uploads, and where they end up.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_graphql::{Enum, InputObject};
use tracing::warn;
use uuid::Uuid;

use crate::error::{NausError, NausResult};

/// Uploads are capped at 5 MiB once decoded.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum FileKind {
    MbbsCertificate,
    FellowshipCertificate,
    ProfilePhoto,
}

impl FileKind {
    pub fn directory(&self) -> &'static str {
        match self {
            FileKind::MbbsCertificate | FileKind::FellowshipCertificate => "certificates",
            FileKind::ProfilePhoto => "profile-photos",
        }
    }

    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            FileKind::MbbsCertificate | FileKind::FellowshipCertificate => {
                &["pdf", "jpg", "jpeg", "png"]
            }
            FileKind::ProfilePhoto => &["jpg", "jpeg", "png"],
        }
    }

    pub fn is_certificate(&self) -> bool {
        !matches!(self, FileKind::ProfilePhoto)
    }

    fn field(&self) -> &'static str {
        match self {
            FileKind::MbbsCertificate => "mbbsCertificate",
            FileKind::FellowshipCertificate => "fellowshipCertificate",
            FileKind::ProfilePhoto => "profilePhoto",
        }
    }
}

/// A file sent inline as base64, optionally as a `data:` URL.
#[derive(InputObject, Clone, Debug)]
pub struct FileUpload {
    /// The original file name, used for its extension
    pub name: String,
    pub content: String,
}

/// A decoded and validated upload, ready to be stored.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub kind: FileKind,
    pub extension: String,
    pub content: Vec<u8>,
}

impl FileUpload {
    pub fn decode(&self, kind: FileKind) -> NausResult<UploadedFile> {
        let extension = Path::new(&self.name)
            .extension()
            .map(|extension| extension.to_string_lossy().to_lowercase())
            .ok_or_else(|| NausError::validation(kind.field(), "File must have an extension"))?;
        if !kind.allowed_extensions().contains(&extension.as_str()) {
            return Err(NausError::validation(
                kind.field(),
                format!(
                    "Only {} files are allowed",
                    kind.allowed_extensions().join(", ")
                ),
            ));
        }

        let encoded = match self.content.split_once(";base64,") {
            Some((_, encoded)) => encoded,
            None => &self.content,
        };
        let content = base64::decode(encoded.trim()).map_err(|err| {
            NausError::validation(kind.field(), format!("Couldn't decode file as base64: {}", err))
        })?;
        if content.len() > MAX_UPLOAD_BYTES {
            return Err(NausError::validation(
                kind.field(),
                "File size must not exceed 5MB",
            ));
        }

        Ok(UploadedFile {
            kind,
            extension,
            content,
        })
    }
}

#[async_trait::async_trait]
pub trait FileStorage: Send + Sync {
    /// Persists the file and returns an opaque reference to it.
    async fn store(&self, file: &UploadedFile) -> NausResult<String>;

    async fn delete(&self, reference: &str) -> NausResult<()>;

    /// Deletes every reference, logging instead of failing.
    async fn discard_all(&self, references: &[String]) {
        for reference in references {
            if let Err(error) = self.delete(reference).await {
                warn!(%reference, %error, "failed to delete stored file");
            }
        }
    }
}

/// Stores uploads on the local disk under `<base>/<kind>/<uuid>.<ext>`.
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub const PUBLIC_PREFIX: &'static str = "/uploads/";

    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn path_for(&self, reference: &str) -> NausResult<PathBuf> {
        let relative = reference
            .strip_prefix(Self::PUBLIC_PREFIX)
            .filter(|relative| !relative.split('/').any(|part| part == ".." || part.is_empty()))
            .ok_or_else(|| NausError::validation("file", format!("Unknown file {}", reference)))?;

        Ok(self.base_path.join(relative))
    }
}

#[async_trait::async_trait]
impl FileStorage for LocalStorage {
    async fn store(&self, file: &UploadedFile) -> NausResult<String> {
        let directory = self.base_path.join(file.kind.directory());
        tokio::fs::create_dir_all(&directory)
            .await
            .with_context(|| format!("Failed to create upload directory {:?}", directory))?;

        let file_name = format!("{}.{}", Uuid::new_v4(), file.extension);
        tokio::fs::write(directory.join(&file_name), &file.content)
            .await
            .with_context(|| format!("Failed to write uploaded file {}", file_name))?;

        Ok(format!(
            "{}{}/{}",
            Self::PUBLIC_PREFIX,
            file.kind.directory(),
            file_name
        ))
    }

    async fn delete(&self, reference: &str) -> NausResult<()> {
        let path = self.path_for(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!("Failed to delete {:?}", path))
                .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content: &str) -> FileUpload {
        FileUpload {
            name: name.to_owned(),
            content: content.to_owned(),
        }
    }

    #[test]
    fn decodes_data_urls() {
        let file = upload("cert.PDF", "data:application/pdf;base64,aGVsbG8=")
            .decode(FileKind::MbbsCertificate)
            .unwrap();

        assert_eq!(file.extension, "pdf");
        assert_eq!(file.content, b"hello");
    }

    #[test]
    fn photos_must_be_images() {
        let result = upload("photo.pdf", "aGVsbG8=").decode(FileKind::ProfilePhoto);

        assert!(matches!(result, Err(NausError::Validation { .. })));
    }

    #[tokio::test]
    async fn local_storage_round_trip() {
        let base = std::env::temp_dir().join(format!("naus-uploads-{}", Uuid::new_v4()));
        let storage = LocalStorage::new(&base);
        let file = upload("photo.png", "aGVsbG8=")
            .decode(FileKind::ProfilePhoto)
            .unwrap();

        let reference = storage.store(&file).await.unwrap();
        assert!(reference.starts_with("/uploads/profile-photos/"));
        assert!(storage.path_for(&reference).unwrap().exists());

        storage.delete(&reference).await.unwrap();
        assert!(!storage.path_for(&reference).unwrap().exists());
        assert!(storage.delete("/uploads/../etc/passwd").await.is_err());
    }
}

//! Local filesystem storage backend.

use super::{mime_for, ByteStream, StorageBackend, StorageError, StorageObject};
use actix_web::web::{self, Bytes};
use async_trait::async_trait;
use futures::stream;
use std::fs;
use std::path::PathBuf;

/// Stores every object directly under one directory.
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// The `base_path` directory will be created if it doesn't exist.
    pub fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path)?;
        log::info!("LocalStorage initialized at {:?}", base_path);
        Ok(Self { base_path })
    }

    fn get_file_path(&self, filename: &str) -> Result<PathBuf, StorageError> {
        if filename.is_empty()
            || filename.starts_with('.')
            || filename.contains(['/', '\\'])
        {
            return Err(StorageError::InvalidKey(filename.to_owned()));
        }
        Ok(self.base_path.join(filename))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn put_object(&self, data: Vec<u8>, filename: &str) -> Result<(), StorageError> {
        let path = self.get_file_path(filename)?;
        log::info!("LocalStorage: put_object: {:?}", path);

        web::block(move || fs::write(&path, data))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<StorageObject, StorageError> {
        let path = self.get_file_path(key)?;
        log::debug!("LocalStorage: get_object: {:?}", path);

        let (buffer, metadata) = web::block(move || -> Result<_, std::io::Error> {
            let metadata = fs::metadata(&path)?;
            let buffer = fs::read(&path)?;
            Ok((buffer, metadata))
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        let modified = metadata.modified().ok();
        let e_tag = modified.map(|t| {
            let duration = t.duration_since(std::time::UNIX_EPOCH).unwrap_or_default();
            format!("\"{}-{}\"", duration.as_secs(), metadata.len())
        });
        let last_modified = modified.map(|t| {
            let datetime: chrono::DateTime<chrono::Utc> = t.into();
            datetime.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
        });

        let content_length = Some(buffer.len() as u64);
        let body: ByteStream = Box::pin(stream::once(async move { Ok(Bytes::from(buffer)) }));

        Ok(StorageObject {
            body,
            content_length,
            content_type: mime_for(key),
            e_tag,
            last_modified,
        })
    }

    async fn delete_object(&self, filename: &str) -> Result<(), StorageError> {
        let path = self.get_file_path(filename)?;
        log::info!("LocalStorage: delete_object: {:?}", path);

        let removed = web::block(move || fs::remove_file(&path))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        match removed {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

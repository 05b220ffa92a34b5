//! Storage backend abstraction for poll image uploads.

pub mod local;

use crate::constants::ALLOWED_IMAGE_EXTENSIONS;
use actix_web::web::Bytes;
use async_trait::async_trait;
use futures::Stream;
use rand::{distributions::Alphanumeric, Rng};
use std::pin::Pin;

/// Length of the random part of a stored filename.
pub const FILENAME_TOKEN_LENGTH: usize = 32;

/// A boxed stream of bytes for streaming file content.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Represents a retrieved storage object with metadata.
pub struct StorageObject {
    pub body: ByteStream,
    pub content_length: Option<u64>,
    pub content_type: mime::Mime,
    /// Entity tag for caching
    pub e_tag: Option<String>,
    pub last_modified: Option<String>,
}

/// Storage operation errors.
#[derive(Debug)]
pub enum StorageError {
    NotFound(String),
    Io(std::io::Error),
    /// The key is not a name this backend would have issued
    InvalidKey(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StorageError::Io(e) => write!(f, "I/O error: {}", e),
            StorageError::InvalidKey(key) => write!(f, "Invalid key: {}", key),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

/// Trait for storage backends.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store a file under `filename`, replacing any previous content.
    async fn put_object(&self, data: Vec<u8>, filename: &str) -> Result<(), StorageError>;

    /// Retrieve a file.
    async fn get_object(&self, key: &str) -> Result<StorageObject, StorageError>;

    /// Remove a file. Removing a missing file is not an error.
    async fn delete_object(&self, filename: &str) -> Result<(), StorageError>;
}

/// Lowercased extension of `filename` if it is an allowed image type.
pub fn image_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    let ext = ext.to_lowercase();
    ALLOWED_IMAGE_EXTENSIONS
        .contains(&ext.as_str())
        .then(|| ext)
}

/// Random storage name keeping the given extension.
pub fn random_filename(ext: &str) -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(FILENAME_TOKEN_LENGTH)
        .map(char::from)
        .collect();
    format!("{}.{}", token.to_lowercase(), ext)
}

/// True for names `random_filename` could have produced.
pub fn is_valid_key(key: &str) -> bool {
    match key.split_once('.') {
        Some((token, _)) => {
            token.len() == FILENAME_TOKEN_LENGTH
                && token.chars().all(|c| c.is_ascii_alphanumeric())
                && image_extension(key).is_some()
        }
        None => false,
    }
}

/// Content type served for a stored image.
pub fn mime_for(filename: &str) -> mime::Mime {
    match image_extension(filename).as_deref() {
        Some("png") => mime::IMAGE_PNG,
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

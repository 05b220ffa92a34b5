use crate::storage::{is_valid_key, StorageBackend, StorageError};
use actix_web::http::header;
use actix_web::{error, get, web, Error, HttpResponse};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_upload);
}

/// Streams a stored poll image.
#[get("/uploads/{filename}")]
pub async fn view_upload(
    storage: web::Data<dyn StorageBackend>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let filename = path.into_inner();
    if !is_valid_key(&filename) {
        return Err(error::ErrorNotFound("Upload not found."));
    }

    let object = storage.get_object(&filename).await.map_err(|e| match e {
        StorageError::NotFound(_) | StorageError::InvalidKey(_) => {
            error::ErrorNotFound("Upload not found.")
        }
        StorageError::Io(e) => {
            log::error!("Failed to read upload {}: {}", filename, e);
            error::ErrorInternalServerError("Failed to read upload.")
        }
    })?;

    let mut response = HttpResponse::Ok();
    response
        .content_type(object.content_type)
        .insert_header((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .insert_header((header::CACHE_CONTROL, "public, max-age=31536000, immutable"));
    if let Some(e_tag) = object.e_tag {
        response.insert_header((header::ETAG, e_tag));
    }
    if let Some(last_modified) = object.last_modified {
        response.insert_header((header::LAST_MODIFIED, last_modified));
    }
    if let Some(length) = object.content_length {
        response.no_chunking(length);
    }

    Ok(response.streaming(object.body))
}

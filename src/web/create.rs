//! Poll creation form and its multipart submission.

use crate::app_config;
use crate::constants::{CATEGORIES, MIN_POLL_OPTIONS};
use crate::middleware::ClientCtx;
use crate::poll::{create_poll, NewPoll, PollError};
use crate::storage::{image_extension, random_filename, StorageBackend};
use crate::web::error::map_poll_error;
use crate::web::notice::{push_notice, take_notices, Notice};
use actix_multipart::{Field, Multipart};
use actix_session::Session;
use actix_web::{error, get, http::header, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use chrono::NaiveDate;
use futures::{StreamExt, TryStreamExt};
use sea_orm::DatabaseConnection;

/// Upper bound for any non-file form field.
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Blank option inputs shown on an empty form.
const BLANK_OPTION_ROWS: usize = 4;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_create_poll).service(post_create_poll);
}

#[derive(Template)]
#[template(path = "create.html")]
pub struct CreatePollTemplate {
    pub client: ClientCtx,
    pub notices: Vec<Notice>,
    pub form: CreatePollForm,
    pub categories: &'static [&'static str],
}

impl CreatePollTemplate {
    pub fn is_selected_category(&self, category: &str) -> bool {
        self.form.category == category
    }
}

/// Raw form values, echoed back into the form when it is re-rendered.
#[derive(Debug, Default)]
pub struct CreatePollForm {
    pub csrf_token: Option<String>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub event_date: String,
    pub options: Vec<String>,
}

impl CreatePollForm {
    /// Option rows for the template, padded with blanks.
    pub fn option_rows(&self) -> Vec<&str> {
        let mut rows: Vec<&str> = self.options.iter().map(String::as_str).collect();
        let min_rows = BLANK_OPTION_ROWS.max(MIN_POLL_OPTIONS);
        while rows.len() < min_rows {
            rows.push("");
        }
        rows
    }

    /// `YYYY-MM-DD`; anything else is treated as no date.
    pub fn parsed_event_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.event_date.trim(), "%Y-%m-%d").ok()
    }

    pub fn to_new_poll(&self) -> NewPoll {
        NewPoll {
            title: self.title.clone(),
            description: Some(self.description.clone()),
            category: Some(self.category.clone()),
            image_filename: None,
            event_date: self.parsed_event_date(),
            options: self.options.clone(),
        }
    }
}

/// An image part that passed the type and size checks.
struct ImageUpload {
    extension: String,
    data: Vec<u8>,
}

fn render_form(client: ClientCtx, notices: Vec<Notice>, form: CreatePollForm) -> HttpResponse {
    CreatePollTemplate {
        client,
        notices,
        form,
        categories: CATEGORIES,
    }
    .to_response()
}

#[get("/admin/create")]
pub async fn view_create_poll(client: ClientCtx, cookies: Session) -> impl Responder {
    render_form(client, take_notices(&cookies), CreatePollForm::default())
}

#[post("/admin/create")]
pub async fn post_create_poll(
    client: ClientCtx,
    cookies: Session,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<dyn StorageBackend>,
    mut multipart: Multipart,
) -> Result<HttpResponse, Error> {
    let max_upload_bytes = app_config::limits().max_upload_bytes();

    let mut form = CreatePollForm::default();
    let mut image: Option<ImageUpload> = None;
    let mut notices: Vec<Notice> = Vec::new();

    while let Some(mut field) = multipart.try_next().await.map_err(|e| {
        log::error!("post_create_poll: multipart read error: {}", e);
        error::ErrorBadRequest("Error interpreting user input.")
    })? {
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_owned();
        let filename = disposition.get_filename().map(str::to_owned);

        match name.as_str() {
            "image" => match read_image_field(&mut field, filename, max_upload_bytes).await? {
                Ok(Some(upload)) => image = Some(upload),
                Ok(None) => {}
                Err(warning) => notices.push(Notice::warning(warning)),
            },
            "csrf_token" => form.csrf_token = Some(read_text_field(&mut field).await?),
            "title" => form.title = read_text_field(&mut field).await?,
            "description" => form.description = read_text_field(&mut field).await?,
            "category" => form.category = read_text_field(&mut field).await?,
            "event_date" => form.event_date = read_text_field(&mut field).await?,
            "options[]" | "options" => form.options.push(read_text_field(&mut field).await?),
            _ => drain_field(&mut field).await?,
        }
    }

    crate::middleware::csrf::validate_csrf_token(
        &cookies,
        form.csrf_token.as_deref().unwrap_or_default(),
    )?;

    let mut new_poll = form.to_new_poll();
    if let Err(e) = new_poll.check() {
        return match e {
            PollError::Validation(msg) => {
                notices.push(Notice::error(msg));
                Ok(render_form(client, notices, form))
            }
            other => Err(map_poll_error(other)),
        };
    }

    if let Some(upload) = image {
        let filename = random_filename(&upload.extension);
        match storage.put_object(upload.data, &filename).await {
            Ok(()) => new_poll.image_filename = Some(filename),
            Err(e) => {
                log::error!("Failed to store poll image {}: {}", filename, e);
                notices.push(Notice::warning(
                    "The image could not be saved. The poll was created without it.",
                ));
            }
        }
    }

    let stored_image = new_poll.image_filename.clone();
    let created = match create_poll(&db, new_poll).await {
        Ok(created) => created,
        Err(e) => {
            if let Some(filename) = stored_image {
                discard_image(storage.get_ref(), &filename).await;
            }
            return match e {
                PollError::Validation(msg) => {
                    notices.push(Notice::error(msg));
                    Ok(render_form(client, notices, form))
                }
                other => Err(map_poll_error(other)),
            };
        }
    };

    for notice in notices {
        push_notice(&cookies, notice);
    }
    push_notice(
        &cookies,
        Notice::success(format!("Poll \"{}\" created.", created.poll.title)),
    );

    Ok(HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/"))
        .finish())
}

/// Removes an image whose poll was never created.
async fn discard_image(storage: &dyn StorageBackend, filename: &str) {
    if let Err(e) = storage.delete_object(filename).await {
        log::error!("Failed to remove orphaned poll image {}: {}", filename, e);
    }
}

async fn read_text_field(field: &mut Field) -> Result<String, Error> {
    let mut buf: Vec<u8> = Vec::with_capacity(128);
    while let Some(chunk) = field.next().await {
        let bytes = chunk.map_err(|e| {
            log::error!("read_text_field: multipart read error: {}", e);
            error::ErrorBadRequest("Error interpreting user input.")
        })?;
        if buf.len() + bytes.len() > MAX_TEXT_FIELD_BYTES {
            return Err(error::ErrorPayloadTooLarge("Form field is too large."));
        }
        buf.extend_from_slice(&bytes);
    }
    String::from_utf8(buf).map_err(|_| error::ErrorBadRequest("Form fields must be UTF-8."))
}

async fn drain_field(field: &mut Field) -> Result<(), Error> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| {
            log::error!("drain_field: multipart read error: {}", e);
            error::ErrorBadRequest("Error interpreting user input.")
        })?;
    }
    Ok(())
}

/// Reads the image part.
///
/// The outer error aborts the request; the inner one is a warning and the
/// poll is created without an image. An empty file input yields `Ok(None)`.
async fn read_image_field(
    field: &mut Field,
    filename: Option<String>,
    max_bytes: usize,
) -> Result<Result<Option<ImageUpload>, String>, Error> {
    let filename = match filename.filter(|f| !f.trim().is_empty()) {
        Some(filename) => filename,
        None => {
            drain_field(field).await?;
            return Ok(Ok(None));
        }
    };

    let extension = match image_extension(&filename) {
        Some(ext) => ext,
        None => {
            drain_field(field).await?;
            return Ok(Err(format!(
                "\"{}\" is not an allowed image type. The poll was created without an image.",
                filename
            )));
        }
    };

    let mut data: Vec<u8> = Vec::new();
    let mut oversized = false;
    while let Some(chunk) = field.next().await {
        let bytes = chunk.map_err(|e| {
            log::error!("read_image_field: multipart read error: {}", e);
            error::ErrorBadRequest("Error interpreting user input.")
        })?;
        if oversized {
            continue;
        }
        if data.len() + bytes.len() > max_bytes {
            oversized = true;
            data = Vec::new();
            continue;
        }
        data.extend_from_slice(&bytes);
    }

    if oversized {
        return Ok(Err(format!(
            "The image is larger than {} MB. The poll was created without an image.",
            max_bytes / (1024 * 1024)
        )));
    }
    if data.is_empty() {
        return Ok(Ok(None));
    }

    Ok(Ok(Some(ImageUpload { extension, data })))
}

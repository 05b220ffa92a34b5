use crate::middleware::ClientCtx;
use crate::poll::PollError;
use actix_web::dev::ServiceResponse;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{error, Error, HttpRequest};
use askama_actix::{Template, TemplateToResponse};

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub client: ClientCtx,
    pub status: u16,
    pub title: &'static str,
    pub message: &'static str,
}

pub fn render_400<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    render_error_page(
        res,
        "Bad Request",
        "The request could not be understood.",
    )
}

pub fn render_403<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    render_error_page(
        res,
        "Forbidden",
        "Your session may have expired. Reload the page and try again.",
    )
}

pub fn render_404<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    render_error_page(
        res,
        "Not Found",
        "The page or poll you are looking for does not exist.",
    )
}

pub fn render_500<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    render_error_page(
        res,
        "Server Error",
        "Something went wrong on our end. Please try again later.",
    )
}

fn render_error_page<B>(
    res: ServiceResponse<B>,
    title: &'static str,
    message: &'static str,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let status = res.status();
    let (req, _) = res.into_parts();

    let mut response = ErrorTemplate {
        client: client_for(&req),
        status: status.as_u16(),
        title,
        message,
    }
    .to_response();
    *response.status_mut() = status;

    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, response).map_into_right_body(),
    ))
}

fn client_for(req: &HttpRequest) -> ClientCtx {
    use actix_web::FromRequest;
    ClientCtx::extract(req).into_inner().unwrap_or_default()
}

/// Converts errors that have no in-page presentation into HTTP errors.
///
/// Handlers deal with validation and state-conflict errors themselves by
/// showing a notice; anything reaching here becomes an error page.
pub fn map_poll_error(e: PollError) -> Error {
    match e {
        PollError::NotFound => error::ErrorNotFound("Poll not found."),
        PollError::Database(db_err) => {
            log::error!("Database error: {}", db_err);
            error::ErrorInternalServerError("Database error")
        }
        other => error::ErrorBadRequest(other.to_string()),
    }
}

use crate::middleware::ClientCtx;
use crate::poll::{user_stats, UserStats};
use crate::web::error::map_poll_error;
use crate::web::notice::{take_notices, Notice};
use actix_session::Session;
use actix_web::{get, web, Error, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_dashboard);
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub client: ClientCtx,
    pub notices: Vec<Notice>,
    pub stats: UserStats,
}

/// Prediction record for the current visitor.
#[get("/dashboard")]
pub async fn view_dashboard(
    client: ClientCtx,
    cookies: Session,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    let stats = user_stats(&db, client.visitor())
        .await
        .map_err(map_poll_error)?;

    Ok(DashboardTemplate {
        client,
        notices: take_notices(&cookies),
        stats,
    }
    .to_response())
}

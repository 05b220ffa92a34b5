use crate::constants::CATEGORIES;
use crate::middleware::ClientCtx;
use crate::poll::{list_polls, Listing, ListingQuery, SortKey};
use crate::web::error::map_poll_error;
use crate::web::notice::{take_notices, Notice};
use actix_session::Session;
use actix_web::{get, web, Error, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_index);
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub client: ClientCtx,
    pub notices: Vec<Notice>,
    pub listing: Listing,
    pub q: String,
    pub category: String,
    pub sort: &'static str,
    pub categories: &'static [&'static str],
}

impl IndexTemplate {
    pub fn is_selected_category(&self, category: &str) -> bool {
        self.category == category
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListingParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

impl ListingParams {
    fn to_query(&self) -> ListingQuery {
        ListingQuery {
            text: self.q.clone(),
            category: self.category.clone(),
            sort: SortKey::parse(self.sort.as_deref()),
        }
    }
}

#[get("/")]
pub async fn view_index(
    client: ClientCtx,
    cookies: Session,
    db: web::Data<DatabaseConnection>,
    params: web::Query<ListingParams>,
) -> Result<impl Responder, Error> {
    let query = params.to_query();
    let listing = list_polls(&db, &query).await.map_err(map_poll_error)?;

    Ok(IndexTemplate {
        client,
        notices: take_notices(&cookies),
        listing,
        q: params.q.clone().unwrap_or_default(),
        category: params.category.clone().unwrap_or_default(),
        sort: query.sort.as_str(),
        categories: CATEGORIES,
    }
    .to_response())
}

//! Poll page and the actions posted back to it.

use crate::middleware::ClientCtx;
use crate::poll::{
    add_comment, cast_vote, delete_poll, poll_detail, resolve, toggle_active, PollDetail,
    PollError, VoteOutcome,
};
use crate::web::error::map_poll_error;
use crate::web::notice::{push_notice, take_notices, Notice};
use actix_session::Session;
use actix_web::{get, http::header, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_poll)
        .service(post_poll_action)
        .service(post_delete_poll);
}

#[derive(Template)]
#[template(path = "poll.html")]
pub struct PollTemplate {
    pub client: ClientCtx,
    pub notices: Vec<Notice>,
    pub detail: PollDetail,
}

/// A submission to `POST /poll/{id}`, decoded once from the form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollAction {
    Vote { option_id: i32 },
    Comment { content: String },
    Resolve { option_id: i32 },
    ToggleActive,
}

impl PollAction {
    /// Picks the action by its submit button. When several are present the
    /// first of vote, comment, resolve, toggle wins.
    pub fn from_form(form: &HashMap<String, String>) -> Result<Self, String> {
        if form.contains_key("vote_submit") {
            return parse_id(form.get("option"))
                .map(|option_id| PollAction::Vote { option_id })
                .ok_or_else(|| "Please select an option to vote for.".to_owned());
        }
        if form.contains_key("comment_submit") {
            return Ok(PollAction::Comment {
                content: form.get("comment").cloned().unwrap_or_default(),
            });
        }
        if form.contains_key("resolve_submit") {
            return parse_id(form.get("outcome"))
                .map(|option_id| PollAction::Resolve { option_id })
                .ok_or_else(|| "Please select the winning option.".to_owned());
        }
        if form.contains_key("toggle_active") {
            return Ok(PollAction::ToggleActive);
        }
        Err("Unrecognized action.".to_owned())
    }
}

fn parse_id(value: Option<&String>) -> Option<i32> {
    value.and_then(|v| v.trim().parse().ok())
}

fn redirect_to_poll(poll_id: i32) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, format!("/poll/{}", poll_id)))
        .finish()
}

#[get("/poll/{poll_id}")]
pub async fn view_poll(
    client: ClientCtx,
    cookies: Session,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let detail = poll_detail(&db, path.into_inner(), Some(client.visitor()))
        .await
        .map_err(map_poll_error)?;

    Ok(PollTemplate {
        client,
        notices: take_notices(&cookies),
        detail,
    }
    .to_response())
}

#[post("/poll/{poll_id}")]
pub async fn post_poll_action(
    client: ClientCtx,
    cookies: Session,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Form<HashMap<String, String>>,
) -> Result<HttpResponse, Error> {
    let poll_id = path.into_inner();
    crate::middleware::csrf::validate_csrf_token(
        &cookies,
        form.get("csrf_token").map(String::as_str).unwrap_or_default(),
    )?;

    let action = match PollAction::from_form(&form) {
        Ok(action) => action,
        Err(msg) => {
            push_notice(&cookies, Notice::error(msg));
            return Ok(redirect_to_poll(poll_id));
        }
    };

    let result = match action {
        PollAction::Vote { option_id } => cast_vote(&db, poll_id, option_id, client.visitor())
            .await
            .map(|outcome| match outcome {
                VoteOutcome::Recorded => "Your vote has been recorded.".to_owned(),
                VoteOutcome::Changed => "Your vote has been changed.".to_owned(),
                VoteOutcome::Unchanged => "You already voted for that option.".to_owned(),
            }),
        PollAction::Comment { content } => add_comment(&db, poll_id, &content, Some(client.visitor()))
            .await
            .map(|_| "Comment posted.".to_owned()),
        PollAction::Resolve { option_id } => resolve(&db, poll_id, option_id)
            .await
            .map(|poll| {
                format!(
                    "Poll resolved. Outcome: {}.",
                    poll.outcome.unwrap_or_default()
                )
            }),
        PollAction::ToggleActive => toggle_active(&db, poll_id).await.map(|poll| {
            if poll.is_active {
                "Poll reopened for voting.".to_owned()
            } else {
                "Poll closed for voting.".to_owned()
            }
        }),
    };

    match result {
        Ok(message) => push_notice(&cookies, Notice::success(message)),
        Err(e @ PollError::Validation(_)) => push_notice(&cookies, Notice::error(e.to_string())),
        Err(e) if e.is_conflict() => {
            log::debug!("Poll {} action rejected: {}", poll_id, e);
            push_notice(&cookies, Notice::error(e.to_string()));
        }
        Err(e) => return Err(map_poll_error(e)),
    }

    Ok(redirect_to_poll(poll_id))
}

#[post("/poll/{poll_id}/delete")]
pub async fn post_delete_poll(
    cookies: Session,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Form<HashMap<String, String>>,
) -> Result<HttpResponse, Error> {
    crate::middleware::csrf::validate_csrf_token(
        &cookies,
        form.get("csrf_token").map(String::as_str).unwrap_or_default(),
    )?;

    let poll_id = path.into_inner();
    delete_poll(&db, poll_id).await.map_err(map_poll_error)?;
    log::info!("Poll {} deleted", poll_id);

    push_notice(&cookies, Notice::success("Poll deleted."));
    Ok(HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/"))
        .finish())
}

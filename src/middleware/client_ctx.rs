use crate::identity::{get_or_issue_visitor_id, VisitorId};
use crate::middleware::csrf::get_or_create_csrf_token;
use actix_session::Session;
use actix_web::dev::{self, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web::Data, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{err, ok, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Client data stored for a single request cycle.
#[derive(Clone, Debug)]
pub struct ClientCtxInner {
    /// Anonymous identity carried in the session cookie.
    pub visitor: VisitorId,
    /// CSRF token for form protection
    pub csrf_token: String,
    pub site_name: String,
    pub site_description: String,
    /// Time the request started for page load statistics.
    pub request_start: Instant,
}

impl Default for ClientCtxInner {
    fn default() -> Self {
        let site = crate::app_config::site();
        Self {
            visitor: VisitorId::generate(),
            csrf_token: String::new(),
            site_name: site.name,
            site_description: site.description,
            request_start: Instant::now(),
        }
    }
}

impl ClientCtxInner {
    pub fn from_session(session: &Session) -> Result<Self, Error> {
        let visitor = get_or_issue_visitor_id(session)?;
        let csrf_token = get_or_create_csrf_token(session)?;

        Ok(ClientCtxInner {
            visitor,
            csrf_token,
            ..Default::default()
        })
    }
}

/// Client context passed to routes.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Debug)]
pub struct ClientCtx(Data<ClientCtxInner>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self(Data::new(ClientCtxInner::default()))
    }
}

impl ClientCtx {
    fn inner(&self) -> &ClientCtxInner {
        &self.0
    }

    pub fn visitor(&self) -> &VisitorId {
        &self.inner().visitor
    }

    pub fn get_csrf_token(&self) -> &str {
        &self.inner().csrf_token
    }

    pub fn site_name(&self) -> &str {
        &self.inner().site_name
    }

    pub fn site_description(&self) -> &str {
        &self.inner().site_description
    }

    /// Returns Duration representing request time.
    pub fn request_time(&self) -> Duration {
        Instant::now() - self.inner().request_start
    }

    /// Returns human readable representing request time.
    pub fn request_time_as_string(&self) -> String {
        let us = self.request_time().as_micros();
        if us > 5000 {
            format!("{}ms", us / 1000)
        } else {
            format!("{}μs", us)
        }
    }
}

/// This implementation is what actually provides the `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<Data<ClientCtxInner>>() {
            Some(inner) => ok(ClientCtx(inner.clone())),
            None => err(actix_web::error::ErrorServiceUnavailable(
                "Client context is not loaded.",
            )),
        }
    }
}

impl<S: 'static, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ClientCtxMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ClientCtxMiddleware {
            service: Rc::new(service),
        })
    }
}

/// Client context middleware
pub struct ClientCtxMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();

        // Borrows of `req` must be done in a precise way to avoid conflicts. This order is important.
        let (httpreq, payload) = req.into_parts();
        let session = Session::extract(&httpreq).into_inner();
        let req = ServiceRequest::from_parts(httpreq, payload);

        Box::pin(async move {
            match session.and_then(|session| ClientCtxInner::from_session(&session)) {
                Ok(inner) => {
                    req.extensions_mut().insert(Data::new(inner));
                }
                Err(err) => {
                    log::error!("Unable to build client context in middleware: {}", err);
                }
            };

            svc.call(req).await
        })
    }
}

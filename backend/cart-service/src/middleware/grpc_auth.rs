/// gRPC-backed authentication middleware
///
/// For every request outside the white list, sends the `Authorization` header
/// value to identity-service and stores the returned identity in request
/// extensions. Exactly one validation call is made per request; dropping the
/// request (client disconnect) drops the call with it. Every response, including
/// a 401 or 503 produced here, echoes `x-correlation-id`.
use crate::error::ApiError;
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest, ResponseError};
use crypto_core::correlation::{CorrelationId, HTTP_CORRELATION_ID_HEADER};
use futures::future::LocalBoxFuture;
use grpc_clients::{AuthClient, AuthorizationIdentity, CallContext};
use regex::Regex;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

// =====================================================================
// White list
// =====================================================================

/// Paths that skip validation.
///
/// Patterns are literal paths where `{name}` matches one path segment and a
/// trailing `*` matches any suffix.
#[derive(Debug, Clone, Default)]
pub struct WhiteList {
    patterns: Vec<Regex>,
}

impl WhiteList {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(&pattern_to_regex(p.as_ref())))
            .collect::<Result<_, _>>()?;
        Ok(Self { patterns })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(path))
    }
}

fn pattern_to_regex(pattern: &str) -> String {
    let (body, open_ended) = match pattern.strip_suffix('*') {
        Some(prefix) => (prefix, true),
        None => (pattern, false),
    };

    let mut regex = String::from("^");
    let mut rest = body;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        regex.push_str(&regex::escape(&rest[..start]));
        regex.push_str("[^/]+");
        rest = &rest[start + len + 1..];
    }
    regex.push_str(&regex::escape(rest));
    regex.push_str(if open_ended { ".*$" } else { "$" });
    regex
}

// =====================================================================
// Middleware
// =====================================================================

/// Actix middleware that validates the caller through identity-service.
#[derive(Clone)]
pub struct GrpcAuthMiddleware {
    client: Arc<AuthClient>,
    white_list: Arc<WhiteList>,
    request_timeout: Duration,
}

impl GrpcAuthMiddleware {
    /// `request_timeout` bounds the whole inbound request; the validation
    /// call gets whatever is left of it, capped by the client's own timeout.
    pub fn new(client: Arc<AuthClient>, white_list: WhiteList, request_timeout: Duration) -> Self {
        Self {
            client,
            white_list: Arc::new(white_list),
            request_timeout,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for GrpcAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = GrpcAuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(GrpcAuthMiddlewareService {
            service: Rc::new(service),
            config: self.clone(),
        }))
    }
}

pub struct GrpcAuthMiddlewareService<S> {
    service: Rc<S>,
    config: GrpcAuthMiddleware,
}

impl<S, B> Service<ServiceRequest> for GrpcAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let config = self.config.clone();

        Box::pin(async move {
            let correlation_id = CorrelationId::from_inbound(
                req.headers()
                    .get(HTTP_CORRELATION_ID_HEADER)
                    .and_then(|h| h.to_str().ok()),
            );
            req.extensions_mut().insert(correlation_id.clone());

            if !config.white_list.contains(req.path()) {
                if let Err(err) = authenticate(&req, &config, &correlation_id).await {
                    let mut res = req.into_response(err.error_response());
                    echo_correlation_id(res.headers_mut(), &correlation_id);
                    return Ok(res.map_into_right_body());
                }
            }

            let mut res = service.call(req).await?;
            echo_correlation_id(res.headers_mut(), &correlation_id);
            Ok(res.map_into_left_body())
        })
    }
}

/// Validate the request's credential and store the identity in extensions.
async fn authenticate(
    req: &ServiceRequest,
    config: &GrpcAuthMiddleware,
    correlation_id: &CorrelationId,
) -> Result<(), ApiError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| {
            tracing::debug!(
                correlation_id = %correlation_id,
                path = %req.path(),
                "request without authorization header"
            );
            ApiError::missing_credentials()
        })?
        .to_string();

    let ctx = CallContext {
        deadline: Some(Instant::now() + config.request_timeout),
        correlation_id: Some(correlation_id.clone()),
    };
    let identity = config.client.validate_with(&auth_header, &ctx).await?;

    tracing::debug!(
        correlation_id = %correlation_id,
        subject_id = identity.subject_id(),
        "request authenticated"
    );
    req.extensions_mut().insert(identity);
    Ok(())
}

fn echo_correlation_id(headers: &mut HeaderMap, correlation_id: &CorrelationId) {
    if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
        headers.insert(HeaderName::from_static(HTTP_CORRELATION_ID_HEADER), value);
    }
}

// =====================================================================
// Extractors
// =====================================================================

/// The validated caller, available to handlers behind [`GrpcAuthMiddleware`].
#[derive(Debug, Clone)]
pub struct Authenticated(pub AuthorizationIdentity);

impl std::ops::Deref for Authenticated {
    type Target = AuthorizationIdentity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for Authenticated {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthorizationIdentity>()
                .cloned()
                .map(Authenticated)
                .ok_or_else(ApiError::missing_credentials),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_list_matches_literals_params_and_prefixes() {
        let list = WhiteList::new(&[
            "/health",
            "/api/v1/products/{id}/",
            "/api/v1/docs/*",
        ])
        .unwrap();

        assert!(list.contains("/health"));
        assert!(!list.contains("/healthz"));
        assert!(list.contains("/api/v1/products/17/"));
        assert!(!list.contains("/api/v1/products/17/reviews/"));
        assert!(!list.contains("/api/v1/products//"));
        assert!(list.contains("/api/v1/docs/"));
        assert!(list.contains("/api/v1/docs/swagger.json"));
        assert!(!list.contains("/api/v1/cart/5/"));
    }

    #[test]
    fn white_list_escapes_regex_metacharacters() {
        let list = WhiteList::new(&["/api/v1/items.json"]).unwrap();
        assert!(list.contains("/api/v1/items.json"));
        assert!(!list.contains("/api/v1/itemsXjson"));
    }

    #[test]
    fn empty_white_list_matches_nothing() {
        let list = WhiteList::new::<&str>(&[]).unwrap();
        assert!(!list.contains("/health"));
    }
}

/// HTTP middleware for post-service
///
/// Bearer token authentication. Tokens are RS256 JWTs issued elsewhere; this
/// service only verifies them and extracts the caller id from `sub`.
use crate::error::AppError;
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

/// Claims this service reads. Extra claims in the token are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Caller id (UUID string)
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

/// Verifies RS256 bearer tokens against a configured public key.
///
/// Built without a key, every token is rejected.
#[derive(Clone)]
pub struct JwtVerifier {
    key: Option<Arc<DecodingKey>>,
    validation: Validation,
}

impl JwtVerifier {
    pub fn from_rsa_pem(public_key_pem: &str) -> Result<Self, AppError> {
        let key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| AppError::Internal(format!("Failed to parse RSA public key: {e}")))?;
        Ok(Self {
            key: Some(Arc::new(key)),
            validation: Validation::new(Algorithm::RS256),
        })
    }

    pub fn disabled() -> Self {
        Self {
            key: None,
            validation: Validation::new(Algorithm::RS256),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Validate `token` and return the caller id
    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| AppError::Unauthorized("Authentication is not configured".to_string()))?;

        let data = decode::<Claims>(token, key, &self.validation)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user ID".to_string()))
    }
}

/// Authenticated caller, stored in request extensions by `JwtAuthMiddleware`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub Uuid);

/// Actix middleware that rejects requests without a valid bearer token.
///
/// Rejections are rendered as `AppError::Unauthorized` responses rather than
/// returned as service errors.
pub struct JwtAuthMiddleware {
    verifier: JwtVerifier,
}

impl JwtAuthMiddleware {
    pub fn new(verifier: JwtVerifier) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            verifier: self.verifier.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    verifier: JwtVerifier,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
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
        match bearer_token(req.request()).and_then(|token| self.verifier.verify(token)) {
            Ok(caller) => {
                req.extensions_mut().insert(CallerId(caller));
                let service = self.service.clone();
                Box::pin(async move {
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                })
            }
            Err(err) => {
                tracing::debug!(path = %req.path(), error = %err, "rejected unauthenticated request");
                let response = req.error_response(err).map_into_right_body();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Result<&str, AppError> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".to_string()))
}

impl FromRequest for CallerId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<CallerId>()
                .copied()
                .ok_or_else(|| AppError::Unauthorized("User ID missing".to_string()).into()),
        )
    }
}

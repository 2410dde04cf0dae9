/// HTTP handlers for post-service
///
/// - Posts: create, list, fetch, delete, like toggle, repost
/// - Comments: add, fetch, delete
/// - Health: summary, readiness, liveness (no auth)
pub mod comments;
pub mod health;
pub mod posts;

pub use health::HealthState;

use crate::error::AppError;
use crate::middleware::{JwtAuthMiddleware, JwtVerifier};
use actix_web::web;

/// Upper bound on a single multipart field of `POST /posts`
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_bytes: usize,
}

/// Register every `/api/v1` route. Mount inside `web::scope("/api/v1")`.
///
/// Expects `PostService`, `CommentService`, `FeedService`, `HealthState` and
/// `UploadLimits` as app data.
pub fn configure(cfg: &mut web::ServiceConfig, verifier: JwtVerifier) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::ValidationError(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| AppError::ValidationError(err.to_string()).into()),
    )
    .route("/health", web::get().to(health::health_summary))
    .route("/health/ready", web::get().to(health::readiness_summary))
    .route("/health/live", web::get().to(health::liveness_check))
    .service(
        web::scope("/posts")
            .wrap(JwtAuthMiddleware::new(verifier.clone()))
            .service(
                web::resource("")
                    .route(web::post().to(posts::add_post))
                    .route(web::get().to(posts::list_posts)),
            )
            .service(
                web::resource("/{post_id}")
                    .route(web::get().to(posts::get_post))
                    .route(web::delete().to(posts::delete_post)),
            )
            .route("/{post_id}/like", web::put().to(posts::like_post))
            .route("/{post_id}/repost", web::post().to(posts::repost))
            .route("/{post_id}/comments", web::post().to(comments::add_comment))
            .route(
                "/{post_id}/comments/{comment_id}",
                web::delete().to(comments::delete_comment),
            ),
    )
    .service(
        web::scope("/comments")
            .wrap(JwtAuthMiddleware::new(verifier))
            .route("/{comment_id}", web::get().to(comments::get_comment)),
    );
}

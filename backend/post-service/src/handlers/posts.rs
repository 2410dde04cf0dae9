/// Post handlers - HTTP endpoints for post operations
use super::UploadLimits;
use crate::error::{AppError, Result};
use crate::media::MediaUpload;
use crate::middleware::CallerId;
use crate::services::{page_number, FeedService, PostService};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Fields of the `multipart/form-data` body of `POST /posts`
#[derive(Debug, Default)]
struct PostForm {
    text: Option<String>,
    media: Option<MediaUpload>,
}

/// Create a new post
pub async fn add_post(
    service: web::Data<PostService>,
    limits: web::Data<UploadLimits>,
    caller: CallerId,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = read_post_form(payload, limits.max_bytes).await?;
    let post = service.add_post(caller.0, form.text, form.media).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Post Created Successfully !",
        "post": post,
    })))
}

/// List posts, newest first
pub async fn list_posts(
    feed: web::Data<FeedService>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page = feed.list_posts(page_number(query.page.as_deref())).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Posts Fetched Successfully !",
        "posts": page.posts,
        "page": page.page,
    })))
}

/// Get a post by ID
pub async fn get_post(
    feed: web::Data<FeedService>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = feed.get_post(*post_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Post Fetched Successfully !",
        "post": post,
    })))
}

/// Delete a post
pub async fn delete_post(
    service: web::Data<PostService>,
    caller: CallerId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    service.delete_post(caller.0, *post_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Post Deleted Successfully !" })))
}

/// Like or unlike a post
pub async fn like_post(
    service: web::Data<PostService>,
    caller: CallerId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let outcome = service.like_post(caller.0, *post_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": outcome.message(),
        "liked": outcome.is_liked(),
    })))
}

/// Repost a post
pub async fn repost(
    service: web::Data<PostService>,
    caller: CallerId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    service.repost(caller.0, *post_id).await?;

    Ok(HttpResponse::Created().json(json!({ "message": "Post Reposted Successfully !" })))
}

async fn read_post_form(mut payload: Multipart, max_bytes: usize) -> Result<PostForm> {
    let mut form = PostForm::default();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::ValidationError(format!("Invalid multipart body: {e}")))?;

        let disposition = field.content_disposition();
        let name = disposition
            .and_then(|cd| cd.get_name())
            .unwrap_or_default()
            .to_string();
        let file_name = disposition
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let content_type = field.content_type().cloned();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|e| AppError::ValidationError(format!("Invalid multipart body: {e}")))?;
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AppError::ValidationError(format!(
                    "Field '{name}' exceeds the {max_bytes} byte limit"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "text" => {
                let text = String::from_utf8(bytes).map_err(|_| {
                    AppError::ValidationError("Post text must be valid UTF-8".to_string())
                })?;
                form.text = Some(text);
            }
            "media" => {
                match &content_type {
                    Some(mime) if mime.type_() == mime::IMAGE => {}
                    Some(mime) => {
                        return Err(AppError::ValidationError(format!(
                            "Unsupported media type: {mime}"
                        )));
                    }
                    None => {
                        return Err(AppError::ValidationError(
                            "Media part must declare an image content type".to_string(),
                        ));
                    }
                }
                form.media = Some(MediaUpload {
                    bytes,
                    file_name,
                    content_type: content_type.map(|m| m.to_string()),
                });
            }
            other => tracing::debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

/// Comment handlers - HTTP endpoints for comment operations
use crate::error::Result;
use crate::middleware::CallerId;
use crate::services::CommentService;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Request body for creating a comment
#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Comment on a post
pub async fn add_comment(
    service: web::Data<CommentService>,
    caller: CallerId,
    post_id: web::Path<Uuid>,
    req: web::Json<AddCommentRequest>,
) -> Result<HttpResponse> {
    let text = req.text.as_deref().unwrap_or_default();
    let comment = service.add_comment(caller.0, *post_id, text).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Comment Added Successfully !",
        "comment": comment,
    })))
}

/// Get a single comment
pub async fn get_comment(
    service: web::Data<CommentService>,
    comment_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let comment = service.get_comment(*comment_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Comment Fetched Successfully !",
        "comment": comment,
    })))
}

/// Delete a comment
pub async fn delete_comment(
    service: web::Data<CommentService>,
    caller: CallerId,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    service.delete_comment(caller.0, post_id, comment_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Comment Deleted Successfully !" })))
}

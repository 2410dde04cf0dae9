/// Cloudinary client for post media
///
/// Uses the signed REST upload API: every request carries `api_key`,
/// `timestamp` and a SHA-1 `signature` over the sorted parameters followed by
/// the API secret.
use super::{MediaStore, MediaUpload};
use crate::config::MediaConfig;
use crate::error::{AppError, Result};
use crate::models::MediaRef;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::time::Duration;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

pub struct CloudinaryMediaStore {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    api_base: String,
    http_client: HttpClient,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorMessage,
}

#[derive(Deserialize)]
struct ErrorMessage {
    message: String,
}

impl CloudinaryMediaStore {
    pub fn from_config(cfg: &MediaConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        tracing::info!(cloud_name = %cfg.cloud_name, "Cloudinary media store initialized");

        Ok(Self {
            cloud_name: cfg.cloud_name.clone(),
            api_key: cfg.api_key.clone(),
            api_secret: cfg.api_secret.clone(),
            api_base: API_BASE.to_string(),
            http_client,
        })
    }

    #[cfg(test)]
    fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", self.api_base, self.cloud_name, action)
    }

    fn timestamp() -> String {
        chrono::Utc::now().timestamp().to_string()
    }

    async fn error_message(resp: reqwest::Response) -> String {
        let status = resp.status();
        match resp.json::<ErrorResponse>().await {
            Ok(body) => format!("{} ({})", body.error.message, status),
            Err(_) => format!("media store returned {}", status),
        }
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as
/// `k=v&k=v`, secret appended, SHA-1, lowercase hex.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaStore for CloudinaryMediaStore {
    async fn upload(&self, upload: MediaUpload, folder: &str) -> Result<MediaRef> {
        let timestamp = Self::timestamp();
        let signature = sign_params(
            &[("folder", folder), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let mut file = Part::bytes(upload.bytes)
            .file_name(upload.file_name.unwrap_or_else(|| "upload".to_string()));
        if let Some(content_type) = upload.content_type.as_deref() {
            file = file
                .mime_str(content_type)
                .map_err(|e| AppError::ValidationError(format!("Invalid media type: {e}")))?;
        }

        let form = Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder.to_string())
            .text("signature", signature);

        let resp = self
            .http_client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::UploadError(Self::error_message(resp).await));
        }

        let body: UploadResponse = resp.json().await?;
        tracing::debug!(public_id = %body.public_id, "media uploaded");

        Ok(MediaRef {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<()> {
        let timestamp = Self::timestamp();
        let signature = sign_params(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let resp = self
            .http_client
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("media destroy request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::Internal(Self::error_message(resp).await));
        }

        let body: DestroyResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("invalid destroy response: {e}")))?;

        match body.result.as_str() {
            "ok" => Ok(()),
            other => Err(AppError::Internal(format!(
                "media destroy for {} returned '{}'",
                public_id, other
            ))),
        }
    }
}

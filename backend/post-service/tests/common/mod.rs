#![allow(dead_code)]

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use post_service::db::{MemoryStore, Repositories, UserRepository};
use post_service::error::{AppError, Result};
use post_service::media::{MediaStore, MediaUpload};
use post_service::middleware::{Claims, JwtVerifier};
use post_service::models::{MediaRef, NewUser, User};
use post_service::services::{CommentService, FeedService, PostService};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const JWT_PRIVATE_KEY_PEM: &str = include_str!("../fixtures/jwt_private.pem");
pub const JWT_PUBLIC_KEY_PEM: &str = include_str!("../fixtures/jwt_public.pem");

pub const MEDIA_FOLDER: &str = "SocialixWebApp/Posts";

/// Media store double that records calls and fails on demand
#[derive(Default)]
pub struct RecordingMediaStore {
    pub uploads: Mutex<Vec<(String, usize)>>,
    pub destroyed: Mutex<Vec<String>>,
    pub fail_uploads: AtomicBool,
    pub fail_destroys: AtomicBool,
}

impl RecordingMediaStore {
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for RecordingMediaStore {
    async fn upload(&self, upload: MediaUpload, folder: &str) -> Result<MediaRef> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::UploadError("media store unavailable".to_string()));
        }

        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((folder.to_string(), upload.bytes.len()));
        let public_id = format!("{}/asset-{}", folder, uploads.len());

        Ok(MediaRef {
            url: format!("https://media.test/{}.png", public_id),
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<()> {
        if self.fail_destroys.load(Ordering::SeqCst) {
            return Err(AppError::UploadError("destroy failed".to_string()));
        }
        self.destroyed.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

/// Services wired to one in-memory store
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub media: Arc<RecordingMediaStore>,
    pub posts: PostService,
    pub comments: CommentService,
    pub feed: FeedService,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_page_size(3)
    }

    pub fn with_page_size(page_size: i64) -> Self {
        let store = Arc::new(MemoryStore::new());
        let media = Arc::new(RecordingMediaStore::default());
        Self::with_repos(store.clone(), Repositories::from_store(store), media, page_size)
    }

    pub fn with_repos(
        store: Arc<MemoryStore>,
        repos: Repositories,
        media: Arc<RecordingMediaStore>,
        page_size: i64,
    ) -> Self {
        Self {
            posts: PostService::new(repos.clone(), media.clone(), MEDIA_FOLDER),
            comments: CommentService::new(repos.clone()),
            feed: FeedService::new(repos, page_size),
            store,
            media,
        }
    }

    pub async fn user(&self, name: &str) -> User {
        create_user(&self.store, name).await
    }

    pub async fn reload(&self, user: &User) -> User {
        self.store
            .find_user(user.id)
            .await
            .unwrap()
            .expect("user should exist")
    }
}

pub async fn create_user(store: &MemoryStore, name: &str) -> User {
    store
        .create_user(NewUser {
            user_name: name.to_string(),
            email: format!("{}@socialix.test", name),
            password_hash: "$argon2id$v=19$test".to_string(),
            bio: None,
        })
        .await
        .unwrap()
}

pub fn image(bytes: &[u8]) -> MediaUpload {
    MediaUpload {
        bytes: bytes.to_vec(),
        file_name: Some("photo.png".to_string()),
        content_type: Some("image/png".to_string()),
    }
}

pub fn verifier() -> JwtVerifier {
    JwtVerifier::from_rsa_pem(JWT_PUBLIC_KEY_PEM).unwrap()
}

/// Sign an RS256 access token for `user_id`, valid for `ttl_secs` (negative = expired)
pub fn token_with_ttl(user_id: Uuid, ttl_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    let key = EncodingKey::from_rsa_pem(JWT_PRIVATE_KEY_PEM.as_bytes()).unwrap();
    encode(&Header::new(Algorithm::RS256), &claims, &key).unwrap()
}

pub fn token(user_id: Uuid) -> String {
    token_with_ttl(user_id, 3600)
}

pub fn bearer(user_id: Uuid) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token(user_id)))
}

/// Data models for post-service
///
/// - `User`, `Post`, `Comment`: stored records. Reference fields hold ids of
///   other records and are kept consistent by the service sagas, not by the
///   store.
/// - `MediaRef`: secure URL + media-store id pair embedded in posts.
/// - `PostView`, `CommentView`, `UserSummary`: read projections with
///   references expanded.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PROFILE_PIC: &str = "https://cdn-icons-png.flaticon.com/512/3135/3135715.png";

/// Asset stored in the media store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Secure URL clients render
    pub url: String,
    /// Store-internal id, needed to destroy the asset later
    pub public_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub bio: Option<String>,
    pub profile_pic: String,
    pub profile_pic_id: Option<String>,
    pub followers: Vec<Uuid>,
    pub posts: Vec<Uuid>,
    pub replies: Vec<Uuid>,
    pub reposts: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when a user record is created
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub password_hash: String,
    pub bio: Option<String>,
}

impl User {
    /// Build a fresh record. Emails are stored trimmed and lowercased.
    pub fn new(new: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_name: new.user_name,
            email: new.email.trim().to_lowercase(),
            password_hash: new.password_hash,
            bio: new.bio,
            profile_pic: DEFAULT_PROFILE_PIC.to_string(),
            profile_pic_id: None,
            followers: Vec::new(),
            posts: Vec::new(),
            replies: Vec::new(),
            reposts: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn list(&self, list: UserList) -> &[Uuid] {
        match list {
            UserList::Posts => &self.posts,
            UserList::Replies => &self.replies,
            UserList::Reposts => &self.reposts,
        }
    }

    pub(crate) fn list_mut(&mut self, list: UserList) -> &mut Vec<Uuid> {
        match list {
            UserList::Posts => &mut self.posts,
            UserList::Replies => &mut self.replies,
            UserList::Reposts => &mut self.reposts,
        }
    }
}

/// Reference lists on a user that the mutation sagas maintain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserList {
    Posts,
    Replies,
    Reposts,
}

impl UserList {
    /// Column holding the list in the `users` table
    pub fn column(self) -> &'static str {
        match self {
            UserList::Posts => "posts",
            UserList::Replies => "replies",
            UserList::Reposts => "reposts",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub text: Option<String>,
    pub media: Option<MediaRef>,
    /// Owning user
    pub admin: Uuid,
    /// Users that like the post (set)
    pub likes: Vec<Uuid>,
    pub comments: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(admin: Uuid, text: Option<String>, media: Option<MediaRef>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            text,
            media,
            admin,
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub text: String,
    /// Post the comment belongs to
    pub post: Uuid,
    /// Authoring user
    pub admin: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post: Uuid, admin: Uuid, text: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            text,
            post,
            admin,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Public profile fields of a user, used when expanding references
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub bio: Option<String>,
    pub profile_pic: String,
    pub followers: Vec<Uuid>,
    pub posts: Vec<Uuid>,
    pub replies: Vec<Uuid>,
    pub reposts: Vec<Uuid>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            bio: user.bio.clone(),
            profile_pic: user.profile_pic.clone(),
            followers: user.followers.clone(),
            posts: user.posts.clone(),
            replies: user.replies.clone(),
            reposts: user.reposts.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub text: String,
    pub post: Uuid,
    pub admin: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub text: Option<String>,
    pub media: Option<MediaRef>,
    pub admin: Option<UserSummary>,
    pub likes: Vec<UserSummary>,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
}

/// Business logic layer for post-service
///
/// - Post service: create/delete posts, like toggle, reposts
/// - Comment service: add/delete comments
/// - Feed service: paginated listing and single-post projection
pub mod comments;
pub mod feed;
pub mod posts;

pub use comments::CommentService;
pub use feed::{page_number, FeedPage, FeedService};
pub use posts::{LikeOutcome, PostService};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct UserEnvelope {
    pub data: UserProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub name: String,
}

/// One page of a post list. The API omits `data` entirely when the list is empty.
#[derive(Debug, Default, Deserialize)]
pub struct PostPage {
    #[serde(default)]
    pub data: Vec<Post>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: String,
    pub text: String,
    pub created_at: Option<String>,
    pub author_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostCollection {
    Bookmarks,
    Likes,
}

impl PostCollection {
    pub fn label(self) -> &'static str {
        match self {
            PostCollection::Bookmarks => "Bookmarks",
            PostCollection::Likes => "Likes",
        }
    }

    pub fn path(self, user_id: &str) -> String {
        match self {
            PostCollection::Bookmarks => format!("/2/users/{user_id}/bookmarks"),
            PostCollection::Likes => format!("/2/users/{user_id}/liked_tweets"),
        }
    }
}

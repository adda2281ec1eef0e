use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

// --- Normalized output ---

/// A tweet joined with its author, ready for the analysis pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchedPost {
    pub tweet_id: String,
    pub text: String,
    pub author_name: Option<String>,
    pub author_username: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub url: String,
}

impl SearchedPost {
    /// "Name (@handle)" when the author was expanded, else "Unknown User".
    pub fn author_label(&self) -> String {
        match (&self.author_name, &self.author_username) {
            (Some(name), Some(username)) => format!("{name} (@{username})"),
            (None, Some(username)) => format!("@{username}"),
            (Some(name), None) => name.clone(),
            (None, None) => "Unknown User".to_string(),
        }
    }
}

// --- Proxy wire types (Twitter API v2 recent-search shape) ---

#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub author_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TweetAuthor {
    pub id: String,
    pub name: String,
    pub username: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<TweetAuthor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchMeta {
    #[serde(default)]
    pub result_count: u32,
}

/// Body of a successful proxy response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<Tweet>,
    #[serde(default)]
    pub includes: Includes,
    #[serde(default)]
    pub meta: SearchMeta,
    #[serde(default)]
    pub errors: Option<Vec<serde_json::Value>>,
}

impl SearchResponse {
    /// Join tweets with their expanded authors.
    pub fn into_posts(self) -> Vec<SearchedPost> {
        let users: HashMap<String, TweetAuthor> = self
            .includes
            .users
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        self.data
            .into_iter()
            .map(|tweet| {
                let author = tweet.author_id.as_ref().and_then(|id| users.get(id));
                let handle = author.map(|a| a.username.as_str()).unwrap_or("anyuser");
                SearchedPost {
                    url: format!("https://twitter.com/{}/status/{}", handle, tweet.id),
                    author_name: author.map(|a| a.name.clone()),
                    author_username: author.map(|a| a.username.clone()),
                    created_at: tweet.created_at,
                    text: tweet.text,
                    tweet_id: tweet.id,
                }
            })
            .collect()
    }
}

/// Body of a failed proxy response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
}

use serde::{Deserialize, Serialize};

use crate::catalog::{Category, Page};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub categories: Vec<Category>,
    pub pages: Vec<Page>,
    pub visits: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AboutResponse {
    pub visits: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub category: Category,
    pub pages: Vec<Page>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryForm {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PageForm {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RestrictedResponse {
    pub username: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// Webhose API types
#[derive(Debug, Deserialize)]
pub struct WebhoseResponse {
    pub posts: Vec<WebhosePost>,
}

#[derive(Debug, Deserialize)]
pub struct WebhosePost {
    pub title: String,
    pub url: String,
    pub text: String,
}

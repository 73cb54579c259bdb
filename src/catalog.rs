//! Categories and the pages filed under them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use url::Url;

pub const MAX_NAME_LEN: usize = 128;
pub const MAX_TITLE_LEN: usize = 128;
pub const MAX_URL_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub slug: String,
    pub views: u64,
    pub likes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub category: String,
    pub title: String,
    pub url: String,
    pub views: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("category name must not be empty")]
    EmptyName,
    #[error("category name is longer than {} characters", MAX_NAME_LEN)]
    NameTooLong,
    #[error("category {0:?} already exists")]
    DuplicateCategory(String),
    #[error("page title must not be empty")]
    EmptyTitle,
    #[error("page title is longer than {} characters", MAX_TITLE_LEN)]
    TitleTooLong,
    #[error("invalid page url: {0}")]
    InvalidUrl(String),
    #[error("category {0:?} does not exist")]
    UnknownCategory(String),
}

/// Lowercases and joins alphanumeric runs with `-`.
pub fn slugify(name: &str) -> String {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let re = SEPARATORS.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));
    re.replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

#[derive(Debug, Default)]
pub struct Catalog {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    categories: Vec<Category>,
    pages: Vec<Page>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_category(&self, name: &str) -> Result<Category, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::EmptyName);
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(CatalogError::NameTooLong);
        }
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(CatalogError::EmptyName);
        }

        let mut inner = self.inner.write().await;
        if inner
            .categories
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(name) || c.slug == slug)
        {
            return Err(CatalogError::DuplicateCategory(name.to_string()));
        }
        let category = Category {
            name: name.to_string(),
            slug,
            views: 0,
            likes: 0,
        };
        inner.categories.push(category.clone());
        info!("Added category {}", category.slug);
        Ok(category)
    }

    pub async fn category(&self, slug: &str) -> Option<Category> {
        let inner = self.inner.read().await;
        inner.categories.iter().find(|c| c.slug == slug).cloned()
    }

    pub async fn pages_for(&self, slug: &str) -> Vec<Page> {
        let inner = self.inner.read().await;
        inner
            .pages
            .iter()
            .filter(|p| p.category == slug)
            .cloned()
            .collect()
    }

    pub async fn add_page(&self, slug: &str, title: &str, url: &str) -> Result<Page, CatalogError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CatalogError::EmptyTitle);
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(CatalogError::TitleTooLong);
        }
        let url = normalize_url(url, MAX_URL_LEN).map_err(CatalogError::InvalidUrl)?;

        let mut inner = self.inner.write().await;
        if !inner.categories.iter().any(|c| c.slug == slug) {
            return Err(CatalogError::UnknownCategory(slug.to_string()));
        }
        let page = Page {
            category: slug.to_string(),
            title: title.to_string(),
            url,
            views: 0,
        };
        inner.pages.push(page.clone());
        info!("Added page {:?} to {}", page.title, slug);
        Ok(page)
    }

    pub async fn top_categories(&self, n: usize) -> Vec<Category> {
        let inner = self.inner.read().await;
        let mut categories = inner.categories.clone();
        categories.sort_by(|a, b| b.likes.cmp(&a.likes));
        categories.truncate(n);
        categories
    }

    pub async fn top_pages(&self, n: usize) -> Vec<Page> {
        let inner = self.inner.read().await;
        let mut pages = inner.pages.clone();
        pages.sort_by(|a, b| b.views.cmp(&a.views));
        pages.truncate(n);
        pages
    }
}

/// Validates a web address the way a URL form field does: a missing scheme
/// defaults to `http://`, and the result must be http(s) with a host and at
/// most `max_len` characters.
pub(crate) fn normalize_url(raw: &str, max_len: usize) -> Result<String, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("must not be empty".to_string());
    }
    let url = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };
    if url.chars().count() > max_len {
        return Err(format!("longer than {} characters", max_len));
    }
    let parsed = Url::parse(&url).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" if parsed.host().is_some() => Ok(url),
        _ => Err("must be an http or https address".to_string()),
    }
}

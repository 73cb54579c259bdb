//! Registered users and password checks.
//!
//! Passwords are stored as PBKDF2-HMAC-SHA256 digests with a per-user random
//! salt. The logged-in user's id lives in the session under [`AUTH_USER_KEY`].

use regex::Regex;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::OnceLock;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::catalog::normalize_url;

/// Session key holding the logged-in user's id.
pub const AUTH_USER_KEY: &str = "_auth_user_id";

pub const MAX_USERNAME_LEN: usize = 150;
const MAX_WEBSITE_LEN: usize = 200;

const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("username may only contain letters, digits and @/./+/-/_")]
    InvalidUsername,
    #[error("username is longer than {} characters", MAX_USERNAME_LEN)]
    UsernameTooLong,
    #[error("username {0:?} is already taken")]
    DuplicateUsername(String),
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("invalid website: {0}")]
    InvalidWebsite(String),
    #[error("Invalid login details supplied.")]
    InvalidCredentials,
    #[error("You must be logged in to see this page.")]
    NotLoggedIn,
    #[error("failed to generate a password salt")]
    Salt,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub website: Option<String>,
}

/// Public view of a user; never carries the password digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub website: Option<String>,
}

#[derive(Debug)]
struct User {
    profile: UserProfile,
    salt: [u8; SALT_LENGTH],
    digest: [u8; HASH_LENGTH],
}

#[derive(Debug)]
pub struct Accounts {
    users: RwLock<HashMap<String, User>>,
    rng: SystemRandom,
}

impl Default for Accounts {
    fn default() -> Self {
        Self::new()
    }
}

impl Accounts {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            rng: SystemRandom::new(),
        }
    }

    pub async fn register(&self, form: RegisterForm) -> Result<UserProfile, AccountError> {
        let username = validate_username(&form.username)?;
        if form.password.is_empty() {
            return Err(AccountError::EmptyPassword);
        }
        let email = validate_email(&form.email)?;
        let website = match form.website.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(normalize_url(raw, MAX_WEBSITE_LEN).map_err(AccountError::InvalidWebsite)?),
        };
        if self.users.read().await.contains_key(&username) {
            return Err(AccountError::DuplicateUsername(username));
        }

        let mut salt = [0u8; SALT_LENGTH];
        self.rng.fill(&mut salt).map_err(|_| AccountError::Salt)?;
        let digest = derive(&salt, &form.password);

        let profile = UserProfile {
            id: Uuid::new_v4(),
            username: username.clone(),
            email,
            website,
        };

        let mut users = self.users.write().await;
        if users.contains_key(&username) {
            return Err(AccountError::DuplicateUsername(username));
        }
        users.insert(
            username,
            User {
                profile: profile.clone(),
                salt,
                digest,
            },
        );
        info!("Registered user {}", profile.username);
        Ok(profile)
    }

    /// Checks a username/password pair. Unknown users and wrong passwords
    /// produce the same error.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<UserProfile, AccountError> {
        let users = self.users.read().await;
        let user = users
            .get(username.trim())
            .ok_or(AccountError::InvalidCredentials)?;
        pbkdf2::verify(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations(),
            &user.salt,
            password.as_bytes(),
            &user.digest,
        )
        .map_err(|_| AccountError::InvalidCredentials)?;
        Ok(user.profile.clone())
    }

    pub async fn user(&self, id: Uuid) -> Option<UserProfile> {
        let users = self.users.read().await;
        users
            .values()
            .find(|u| u.profile.id == id)
            .map(|u| u.profile.clone())
    }
}

fn iterations() -> NonZeroU32 {
    NonZeroU32::new(PBKDF2_ITERATIONS).unwrap_or(NonZeroU32::MIN)
}

fn derive(salt: &[u8], password: &str) -> [u8; HASH_LENGTH] {
    let mut digest = [0u8; HASH_LENGTH];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations(),
        salt,
        password.as_bytes(),
        &mut digest,
    );
    digest
}

fn validate_username(raw: &str) -> Result<String, AccountError> {
    static ALLOWED: OnceLock<Regex> = OnceLock::new();
    let re = ALLOWED.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("valid regex"));

    let username = raw.trim();
    if username.is_empty() {
        return Err(AccountError::EmptyUsername);
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AccountError::UsernameTooLong);
    }
    if !re.is_match(username) {
        return Err(AccountError::InvalidUsername);
    }
    Ok(username.to_string())
}

/// Blank is allowed; otherwise a single `@` with text on both sides.
fn validate_email(raw: &str) -> Result<String, AccountError> {
    let email = raw.trim();
    if email.is_empty() {
        return Ok(String::new());
    }
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && domain.contains('.') && !domain.contains('@') && !email.contains(char::is_whitespace) =>
        {
            Ok(email.to_string())
        }
        _ => Err(AccountError::InvalidEmail),
    }
}

//! Cookie sessions
//!
//! A session cookie is `id-expires-sha1(id-passwd-expires-secret)`. The
//! stored password hash takes part in the digest, so changing the password
//! invalidates every outstanding cookie.

use async_trait::async_trait;
use config::SessionConfig;
use dispatcher::{Authenticator, Reply, Request, SessionUser};
use sha1::{Digest, Sha1};
use store_object::{ModelStore, StoreError};

use crate::models::User;
use crate::trace_log;

/// Shown instead of the stored password hash
pub const PASSWD_MASK: &str = "******";

/// Path prefix reserved for admin users
pub const MANAGE_PREFIX: &str = "/manage/";

fn sha1_hex(input: &str) -> String {
    format!("{:x}", Sha1::digest(input.as_bytes()))
}

/// Stored form of a password: `sha1(id:passwd)`.
///
/// `passwd` is itself the client-side sha1 of `email:password`.
pub fn hash_password(user_id: &str, passwd: &str) -> String {
    sha1_hex(&format!("{}:{}", user_id, passwd))
}

fn cookie_digest(user_id: &str, passwd: &str, expires: i64, secret: &str) -> String {
    sha1_hex(&format!("{}-{}-{}-{}", user_id, passwd, expires, secret))
}

/// Session cookie value for `user`, valid until `now + max_age`
pub fn user2cookie(user: &User, max_age: i64, secret: &str, now: i64) -> String {
    let id = user.id().map(String::as_str).unwrap_or_default();
    let passwd = user.passwd().map(String::as_str).unwrap_or_default();
    let expires = now + max_age;
    format!("{}-{}-{}", id, expires, cookie_digest(id, passwd, expires, secret))
}

/// Split a cookie into `(id, expires, digest)` if it is well formed and not
/// expired at `now`
pub fn parse_cookie(cookie: &str, now: i64) -> Option<(&str, i64, &str)> {
    let mut parts = cookie.split('-');
    let (id, expires, digest) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || id.is_empty() {
        return None;
    }
    let expires: i64 = expires.parse().ok()?;
    if expires < now {
        return None;
    }
    Some((id, expires, digest))
}

/// Whether `digest` was issued for `user` with `expires` and `secret`
pub fn verify_digest(user: &User, expires: i64, digest: &str, secret: &str) -> bool {
    let id = user.id().map(String::as_str).unwrap_or_default();
    let passwd = user.passwd().map(String::as_str).unwrap_or_default();
    cookie_digest(id, passwd, expires, secret) == digest
}

/// Replace the stored password hash before a user leaves the server
pub fn mask_password(user: &mut User) -> Result<(), StoreError> {
    use store_object::Model;
    user.set("passwd", PASSWD_MASK)
}

/// Resolve a session cookie to its user, password masked.
///
/// Malformed, expired or forged cookies resolve to `None`.
pub async fn cookie2user(
    users: &ModelStore<User>,
    cookie: &str,
    secret: &str,
    now: i64,
) -> Result<Option<User>, StoreError> {
    let Some((id, expires, digest)) = parse_cookie(cookie, now) else {
        trace_log!("rejecting malformed or expired cookie");
        return Ok(None);
    };
    let Some(mut user) = users.find(id).await? else {
        return Ok(None);
    };
    if !verify_digest(&user, expires, digest, secret) {
        tracing::info!("invalid sha1");
        return Ok(None);
    }
    mask_password(&mut user)?;
    Ok(Some(user))
}

pub fn session_user(user: &User) -> SessionUser {
    let text = |value: Option<&String>| value.cloned().unwrap_or_default();
    SessionUser {
        id: text(user.id()),
        email: text(user.email()),
        name: text(user.name()),
        image: text(user.image()),
        admin: user.admin().copied().unwrap_or(false),
    }
}

/// Attaches the cookie's user to each request and guards the manage pages
pub struct SessionAuthenticator {
    users: ModelStore<User>,
    session: SessionConfig,
}

impl SessionAuthenticator {
    pub fn new(users: ModelStore<User>, session: SessionConfig) -> Self {
        Self { users, session }
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn authenticate(&self, request: &mut Request) -> Option<Reply> {
        tracing::info!("check user: {} {}", request.method, request.path);
        if let Some(cookie) = request.cookie(&self.session.cookie_name) {
            let now = chrono::Utc::now().timestamp();
            match cookie2user(&self.users, &cookie, &self.session.secret, now).await {
                Ok(Some(user)) => {
                    let user = session_user(&user);
                    tracing::info!("set current user: {}", user.email);
                    request.user = Some(user);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("failed to resolve session cookie: {}", e),
            }
        }

        let is_admin = request.user.as_ref().is_some_and(|user| user.admin);
        if request.path.starts_with(MANAGE_PREFIX) && !is_admin {
            return Some(Reply::redirect("/signin"));
        }
        None
    }
}

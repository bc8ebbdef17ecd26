//! Blog pages and JSON API
//!
//! Handlers take the shared [`AppState`] plus their bound arguments. The
//! route table in [`routes`] states each handler's parameters.

use std::future::Future;
use std::sync::{Arc, LazyLock};

use config::SessionConfig;
use dispatcher::{
    ApiError, CallArgs, Cookie, Handler, HandlerError, Method, RegistrationError, Reply, Router,
    SessionUser, Signature,
};
use regex::Regex;
use serde_json::json;
use store_object::{FindQuery, Model, ModelStore, Page, QueryExecutor};
use type_mapping::SqlValue;

use crate::auth::{hash_password, mask_password, user2cookie};
use crate::models::{Blog, Comment, User, next_id};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9.\-_]+@[a-z0-9\-_]+(\.[a-z0-9\-_]+){1,4}$")
        .unwrap_or_else(|e| panic!("invalid email pattern: {}", e))
});

static SHA1_HEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-f]{40}$").unwrap_or_else(|e| panic!("invalid sha1 pattern: {}", e))
});

const NEWEST_FIRST: &str = "\"created_at\" DESC";

/// Stores and session settings shared by every handler
pub struct AppState {
    pub users: ModelStore<User>,
    pub blogs: ModelStore<Blog>,
    pub comments: ModelStore<Comment>,
    pub session: SessionConfig,
}

impl AppState {
    pub fn new(executor: QueryExecutor, session: SessionConfig) -> Self {
        Self {
            users: ModelStore::new(executor.clone()),
            blogs: ModelStore::new(executor.clone()),
            comments: ModelStore::new(executor),
            session,
        }
    }
}

/// Page number from user input; anything unparsable or below 1 is page 1
pub fn page_index(page: Option<&str>) -> u64 {
    page.and_then(|page| page.trim().parse::<u64>().ok())
        .filter(|index| *index >= 1)
        .unwrap_or(1)
}

pub fn valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

pub fn valid_sha1(passwd: &str) -> bool {
    SHA1_HEX.is_match(passwd)
}

fn require_admin(args: &CallArgs) -> Result<&SessionUser, ApiError> {
    match args.user() {
        Some(user) if user.admin => Ok(user),
        _ => Err(ApiError::permission("Admin privilege required.")),
    }
}

fn require_text<'a>(args: &'a CallArgs, field: &str) -> Result<&'a str, ApiError> {
    let value = args.require_str(field)?.trim();
    if value.is_empty() {
        return Err(ApiError::value_invalid(field, &format!("{} cannot be empty.", field)));
    }
    Ok(value)
}

async fn count<T: Model>(store: &ModelStore<T>) -> Result<u64, HandlerError> {
    let number = store.find_number("count(\"id\")", None, Vec::new()).await?;
    Ok(number
        .as_ref()
        .and_then(SqlValue::as_i64)
        .map_or(0, |n| n.max(0) as u64))
}

/// Newest-first listing page of `store` with its page metadata
async fn list_page<T: Model>(
    store: &ModelStore<T>,
    page: Option<&str>,
) -> Result<(Page, Vec<T>), HandlerError> {
    let page = Page::with_default_size(count(store).await?, page_index(page));
    if page.item_count == 0 {
        return Ok((page, Vec::new()));
    }
    let items = store
        .find_all(FindQuery::new().order_by(NEWEST_FIRST).limit(page.window()))
        .await?;
    Ok((page, items))
}

fn session_cookie(state: &AppState, user: &User) -> Cookie {
    let max_age = state.session.max_age_seconds as i64;
    let now = chrono::Utc::now().timestamp();
    Cookie::new(
        &state.session.cookie_name,
        &user2cookie(user, max_age, &state.session.secret, now),
        max_age,
    )
}

async fn find_blog(state: &AppState, id: &str) -> Result<Blog, HandlerError> {
    state
        .blogs
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Blog", "Blog not found.").into())
}

pub async fn index(state: Arc<AppState>, args: CallArgs) -> Result<Reply, HandlerError> {
    let (page, blogs) = list_page(&state.blogs, args.str("page")).await?;
    Ok(Reply::template(
        "blogs.html",
        json!({ "page": page, "blogs": blogs }),
    ))
}

pub async fn get_blog(state: Arc<AppState>, args: CallArgs) -> Result<Reply, HandlerError> {
    let id = args.require_str("id")?;
    let blog = find_blog(&state, id).await?;
    let comments = state
        .comments
        .find_all(
            FindQuery::new()
                .filter("\"blog_id\"=?", vec![args.sql("id")?])
                .order_by(NEWEST_FIRST),
        )
        .await?;
    Ok(Reply::template(
        "blog.html",
        json!({ "blog": blog, "comments": comments }),
    ))
}

pub async fn register(_args: CallArgs) -> Result<Reply, HandlerError> {
    Ok(Reply::template("register.html", json!({})))
}

pub async fn signin(_args: CallArgs) -> Result<Reply, HandlerError> {
    Ok(Reply::template("signin.html", json!({})))
}

pub async fn signout(state: Arc<AppState>, args: CallArgs) -> Result<Reply, HandlerError> {
    let referer = args
        .request()
        .and_then(|request| request.header("referer"))
        .unwrap_or("/");
    tracing::info!("user signed out.");
    Ok(Reply::redirect(referer).with_cookie(Cookie::expired(&state.session.cookie_name)))
}

pub async fn authenticate(state: Arc<AppState>, args: CallArgs) -> Result<Reply, HandlerError> {
    let email = args.require_str("email")?.trim();
    let passwd = args.require_str("passwd")?;
    if email.is_empty() {
        return Err(ApiError::value_invalid("email", "Invalid email.").into());
    }
    if passwd.is_empty() {
        return Err(ApiError::value_invalid("passwd", "Invalid password.").into());
    }

    let mut users = state
        .users
        .find_all(FindQuery::new().filter("\"email\"=?", vec![SqlValue::from(email)]))
        .await?;
    if users.is_empty() {
        return Err(ApiError::value_invalid("email", "Email not exist.").into());
    }
    let mut user = users.swap_remove(0);

    let id = user.id().map(String::as_str).unwrap_or_default();
    if user.passwd().map(String::as_str) != Some(hash_password(id, passwd).as_str()) {
        return Err(ApiError::value_invalid("passwd", "Invalid password.").into());
    }

    let cookie = session_cookie(&state, &user);
    mask_password(&mut user)?;
    Ok(Reply::to_json(&user)?.with_cookie(cookie))
}

pub async fn register_user(state: Arc<AppState>, args: CallArgs) -> Result<Reply, HandlerError> {
    let name = require_text(&args, "name")?;
    let email = args.require_str("email")?.trim().to_ascii_lowercase();
    let passwd = args.require_str("passwd")?;
    if !valid_email(&email) {
        return Err(ApiError::value_invalid("email", "Invalid email.").into());
    }
    if !valid_sha1(passwd) {
        return Err(ApiError::value_invalid("passwd", "Invalid password.").into());
    }

    let existing = state
        .users
        .find_all(FindQuery::new().filter("\"email\"=?", vec![SqlValue::from(email.as_str())]))
        .await?;
    if !existing.is_empty() {
        return Err(ApiError::new("register:failed", "email", "Email is already in use.").into());
    }

    let id = next_id();
    let mut user = User::new();
    user.set("id", id.as_str())?;
    user.set("name", name)?;
    user.set("email", email.as_str())?;
    user.set("passwd", hash_password(&id, passwd))?;
    user.set("image", "about:blank")?;
    state.users.save(&mut user).await?;

    let cookie = session_cookie(&state, &user);
    mask_password(&mut user)?;
    Ok(Reply::to_json(&user)?.with_cookie(cookie))
}

pub async fn api_users(state: Arc<AppState>, args: CallArgs) -> Result<Reply, HandlerError> {
    let (page, mut users) = list_page(&state.users, args.str("page")).await?;
    for user in &mut users {
        mask_password(user)?;
    }
    Ok(Reply::json(json!({ "page": page, "users": users })))
}

pub async fn api_blogs(state: Arc<AppState>, args: CallArgs) -> Result<Reply, HandlerError> {
    let (page, blogs) = list_page(&state.blogs, args.str("page")).await?;
    Ok(Reply::json(json!({ "page": page, "blogs": blogs })))
}

pub async fn api_get_blog(state: Arc<AppState>, args: CallArgs) -> Result<Reply, HandlerError> {
    let blog = find_blog(&state, args.require_str("id")?).await?;
    Reply::to_json(&blog)
}

pub async fn api_create_blog(state: Arc<AppState>, args: CallArgs) -> Result<Reply, HandlerError> {
    let author = require_admin(&args)?;
    let name = require_text(&args, "name")?;
    let summary = require_text(&args, "summary")?;
    let content = require_text(&args, "content")?;

    let mut blog = Blog::new();
    blog.set("user_id", author.id.as_str())?;
    blog.set("user_name", author.name.as_str())?;
    blog.set("user_image", author.image.as_str())?;
    blog.set("name", name)?;
    blog.set("summary", summary)?;
    blog.set("content", content)?;
    state.blogs.save(&mut blog).await?;
    Reply::to_json(&blog)
}

pub async fn api_update_blog(state: Arc<AppState>, args: CallArgs) -> Result<Reply, HandlerError> {
    require_admin(&args)?;
    let name = require_text(&args, "name")?;
    let summary = require_text(&args, "summary")?;
    let content = require_text(&args, "content")?;

    let mut blog = find_blog(&state, args.require_str("id")?).await?;
    blog.set("name", name)?;
    blog.set("summary", summary)?;
    blog.set("content", content)?;
    state.blogs.update(&blog).await?;
    Reply::to_json(&blog)
}

pub async fn api_delete_blog(state: Arc<AppState>, args: CallArgs) -> Result<Reply, HandlerError> {
    require_admin(&args)?;
    let id = args.require_str("id")?;
    let blog = find_blog(&state, id).await?;
    state.blogs.remove(&blog).await?;
    Ok(Reply::json(json!({ "id": id })))
}

pub async fn api_comments(state: Arc<AppState>, args: CallArgs) -> Result<Reply, HandlerError> {
    let (page, comments) = list_page(&state.comments, args.str("page")).await?;
    Ok(Reply::json(json!({ "page": page, "comments": comments })))
}

pub async fn api_create_comment(state: Arc<AppState>, args: CallArgs) -> Result<Reply, HandlerError> {
    let Some(author) = args.user() else {
        return Err(ApiError::permission("Please signin first.").into());
    };
    let content = require_text(&args, "content")?;
    let blog = find_blog(&state, args.require_str("id")?).await?;

    let mut comment = Comment::new();
    comment.set("blog_id", blog.id().map(String::as_str).unwrap_or_default())?;
    comment.set("user_id", author.id.as_str())?;
    comment.set("user_name", author.name.as_str())?;
    comment.set("user_image", author.image.as_str())?;
    comment.set("content", content)?;
    state.comments.save(&mut comment).await?;
    Reply::to_json(&comment)
}

pub async fn api_delete_comment(state: Arc<AppState>, args: CallArgs) -> Result<Reply, HandlerError> {
    require_admin(&args)?;
    let id = args.require_str("id")?;
    let comment = state
        .comments
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment", "Comment not found."))?;
    state.comments.remove(&comment).await?;
    Ok(Reply::json(json!({ "id": id })))
}

pub async fn manage_blogs(args: CallArgs) -> Result<Reply, HandlerError> {
    Ok(Reply::template(
        "manage_blogs.html",
        json!({ "page_index": page_index(args.str("page")) }),
    ))
}

pub async fn manage_create_blog(_args: CallArgs) -> Result<Reply, HandlerError> {
    Ok(Reply::template(
        "manage_blog_edit.html",
        json!({ "id": "", "action": "/api/blogs" }),
    ))
}

/// Handler that hands `state` to `f` on every call
fn with_state<F, Fut>(state: Arc<AppState>, f: F) -> impl Handler
where
    F: Fn(Arc<AppState>, CallArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
{
    move |args: CallArgs| f(Arc::clone(&state), args)
}

/// Route table of the blog
pub fn routes(state: Arc<AppState>) -> Result<Router, RegistrationError> {
    let s = || Arc::clone(&state);
    let mut router = Router::new();

    router.register(Method::Get, "/", "index", Signature::new().optional("page"), with_state(s(), index))?;
    router.register(Method::Get, "/blog/{id}", "get_blog", Signature::new().positional("id"), with_state(s(), get_blog))?;
    router.register(Method::Get, "/register", "register", Signature::new(), register)?;
    router.register(Method::Get, "/signin", "signin", Signature::new(), signin)?;
    router.register(Method::Get, "/signout", "signout", Signature::new().request(), with_state(s(), signout))?;
    router.register(
        Method::Post,
        "/api/authenticate",
        "authenticate",
        Signature::new().required("email").required("passwd"),
        with_state(s(), authenticate),
    )?;
    router.register(
        Method::Post,
        "/api/users",
        "register_user",
        Signature::new().required("email").required("name").required("passwd"),
        with_state(s(), register_user),
    )?;
    router.register(Method::Get, "/api/users", "api_users", Signature::new().optional("page"), with_state(s(), api_users))?;
    router.register(Method::Get, "/api/blogs", "api_blogs", Signature::new().optional("page"), with_state(s(), api_blogs))?;
    router.register(Method::Get, "/api/blogs/{id}", "api_get_blog", Signature::new().positional("id"), with_state(s(), api_get_blog))?;
    router.register(
        Method::Post,
        "/api/blogs",
        "api_create_blog",
        Signature::new().request().required("name").required("summary").required("content"),
        with_state(s(), api_create_blog),
    )?;
    router.register(
        Method::Post,
        "/api/blogs/{id}",
        "api_update_blog",
        Signature::new()
            .positional("id")
            .request()
            .required("name")
            .required("summary")
            .required("content"),
        with_state(s(), api_update_blog),
    )?;
    router.register(
        Method::Post,
        "/api/blogs/{id}/delete",
        "api_delete_blog",
        Signature::new().positional("id").request(),
        with_state(s(), api_delete_blog),
    )?;
    router.register(Method::Get, "/api/comments", "api_comments", Signature::new().optional("page"), with_state(s(), api_comments))?;
    router.register(
        Method::Post,
        "/api/blogs/{id}/comments",
        "api_create_comment",
        Signature::new().positional("id").request().required("content"),
        with_state(s(), api_create_comment),
    )?;
    router.register(
        Method::Post,
        "/api/comments/{id}/delete",
        "api_delete_comment",
        Signature::new().positional("id").request(),
        with_state(s(), api_delete_comment),
    )?;
    router.register(Method::Get, "/manage/blogs", "manage_blogs", Signature::new().optional("page"), manage_blogs)?;
    router.register(Method::Get, "/manage/blogs/create", "manage_create_blog", Signature::new(), manage_create_blog)?;

    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_index() {
        assert_eq!(page_index(None), 1);
        assert_eq!(page_index(Some("3")), 3);
        assert_eq!(page_index(Some(" 2 ")), 2);
        assert_eq!(page_index(Some("0")), 1);
        assert_eq!(page_index(Some("-4")), 1);
        assert_eq!(page_index(Some("abc")), 1);
    }

    #[test]
    fn test_email_validation() {
        assert!(valid_email("ann@example.com"));
        assert!(valid_email("a.b-c_d@mail.example.co.uk"));
        assert!(!valid_email("Ann@Example.com"));
        assert!(!valid_email("ann@localhost"));
        assert!(!valid_email("no-at-sign.com"));
        assert!(!valid_email("ann@a.b.c.d.e.f"));
    }

    #[test]
    fn test_sha1_validation() {
        assert!(valid_sha1("da39a3ee5e6b4b0d3255bfef95601890afd80709"));
        assert!(!valid_sha1("DA39A3EE5E6B4B0D3255BFEF95601890AFD80709"));
        assert!(!valid_sha1("da39a3ee"));
        assert!(!valid_sha1("plain password"));
    }

    #[test]
    fn test_require_admin() {
        let request = dispatcher::Request::new(Method::Post, "/api/blogs");
        let args = CallArgs::default().with_request(Arc::new(request.clone()));
        assert_eq!(
            require_admin(&args).unwrap_err().error,
            "permission: forbidden"
        );

        let mut request = request;
        request.user = Some(SessionUser {
            id: "u1".into(),
            email: "ann@example.com".into(),
            name: "Ann".into(),
            image: String::new(),
            admin: true,
        });
        let args = CallArgs::default().with_request(Arc::new(request));
        assert_eq!(require_admin(&args).unwrap().id, "u1");
    }

    #[test]
    fn test_require_text_rejects_blank() {
        let mut values = serde_json::Map::new();
        values.insert("name".into(), json!("   "));
        values.insert("summary".into(), json!(" ok "));
        let args = CallArgs::new(values);

        let err = require_text(&args, "name").unwrap_err();
        assert_eq!((err.error.as_str(), err.data.as_str()), ("value: invalid", "name"));
        assert_eq!(require_text(&args, "summary").unwrap(), "ok");
    }
}

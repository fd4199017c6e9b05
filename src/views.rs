//! Server-rendered HTML pages.

use crate::auth::{
    dto::PublicUser,
    session::Flash,
};

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn base_style() -> &'static str {
    r#"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        background: #f5f5f5; color: #333; padding: 20px;
    }
    nav { max-width: 480px; margin: 0 auto 16px; display: flex; gap: 12px; font-size: 14px; }
    nav a { color: #4a6cf7; text-decoration: none; }
    .card {
        background: #fff; border-radius: 16px; padding: 32px; margin: 0 auto;
        max-width: 480px; box-shadow: 0 4px 24px rgba(0,0,0,0.08);
    }
    h1 { font-size: 24px; margin-bottom: 16px; }
    .form-group { margin-bottom: 16px; }
    .form-group label { display: block; font-size: 14px; margin-bottom: 6px; }
    .form-group input { width: 100%; padding: 10px 12px; border: 1.5px solid #ddd; border-radius: 8px; }
    .btn { width: 100%; padding: 12px; border: none; border-radius: 8px; background: #4a6cf7; color: #fff; cursor: pointer; }
    .flash { padding: 10px 14px; border-radius: 8px; font-size: 13px; margin-bottom: 16px; }
    .flash-success { background: #effaf1; color: #2e7d32; }
    .flash-danger { background: #fff0f0; color: #d32f2f; }
    .flash-warning { background: #fff8e1; color: #a86b00; }
    .flash-info { background: #eef3ff; color: #3b5de7; }
    dl dt { font-size: 12px; color: #888; margin-top: 12px; }
    "#
}

fn render_flashes(flashes: &[Flash]) -> String {
    flashes
        .iter()
        .map(|f| {
            format!(
                r#"<div class="flash flash-{}">{}</div>"#,
                f.category.as_str(),
                escape(&f.message)
            )
        })
        .collect::<Vec<_>>()
        .join("\n  ")
}

fn layout(title: &str, username: Option<&str>, flashes: &[Flash], body: &str) -> String {
    let nav = match username {
        Some(_) => r#"<a href="/">Home</a><a href="/profile">Profile</a><a href="/auth/logout">Log out</a>"#,
        None => r#"<a href="/">Home</a><a href="/auth/login">Log in</a><a href="/auth/register">Register</a>"#,
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title}</title>
<style>{style}</style>
</head><body>
<nav>{nav}</nav>
<div class="card">
  {flashes}
  {body}
</div>
</body></html>"#,
        title = escape(title),
        style = base_style(),
        flashes = render_flashes(flashes),
    )
}

pub fn render_index(username: Option<&str>, flashes: &[Flash]) -> String {
    let body = match username {
        Some(name) => format!(
            r#"<h1>Welcome</h1>
  <p>Logged in as <strong>{}</strong>.</p>"#,
            escape(name)
        ),
        None => r#"<h1>Welcome</h1>
  <p>You are not logged in.</p>"#
            .to_string(),
    };
    layout("Home", username, flashes, &body)
}

pub fn render_register(flashes: &[Flash]) -> String {
    let body = r#"<h1>Create an account</h1>
  <form method="POST" action="/auth/register">
    <div class="form-group">
      <label for="username">Username</label>
      <input type="text" id="username" name="username" required maxlength="128" autocomplete="username">
    </div>
    <div class="form-group">
      <label for="email">Email (optional)</label>
      <input type="email" id="email" name="email" maxlength="256" autocomplete="email">
    </div>
    <div class="form-group">
      <label for="password">Password</label>
      <input type="password" id="password" name="password" required minlength="8" autocomplete="new-password">
    </div>
    <div class="form-group">
      <label for="password2">Confirm password</label>
      <input type="password" id="password2" name="password2" required minlength="8" autocomplete="new-password">
    </div>
    <button type="submit" class="btn">Register</button>
  </form>"#;
    layout("Register", None, flashes, body)
}

pub fn render_login(next: Option<&str>, flashes: &[Flash]) -> String {
    let action = match next {
        Some(n) => format!("/auth/login?next={}", escape(&urlencoding::encode(n))),
        None => "/auth/login".to_string(),
    };
    let body = format!(
        r#"<h1>Log in</h1>
  <form method="POST" action="{action}">
    <div class="form-group">
      <label for="username">Username</label>
      <input type="text" id="username" name="username" required autocomplete="username">
    </div>
    <div class="form-group">
      <label for="password">Password</label>
      <input type="password" id="password" name="password" required autocomplete="current-password">
    </div>
    <button type="submit" class="btn">Log in</button>
  </form>"#
    );
    layout("Log in", None, flashes, &body)
}

pub fn render_profile(user: &PublicUser, flashes: &[Flash]) -> String {
    let email = user.email.as_deref().map(escape).unwrap_or_else(|| "-".into());
    let body = format!(
        r#"<h1>Profile</h1>
  <dl>
    <dt>ID</dt><dd>{id}</dd>
    <dt>Username</dt><dd>{username}</dd>
    <dt>Email</dt><dd>{email}</dd>
    <dt>Registered</dt><dd>{created_at}</dd>
    <dt>Status</dt><dd>{status}</dd>
  </dl>"#,
        id = user.id,
        username = escape(&user.username),
        created_at = escape(&user.created_at),
        status = escape(&user.status),
    );
    layout("Profile", Some(&user.username), flashes, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::FlashCategory;

    #[test]
    fn interpolated_values_are_escaped() {
        let flashes = vec![Flash {
            category: FlashCategory::Danger,
            message: "<script>alert(1)</script>".into(),
        }];
        let html = render_index(Some("a&b"), &flashes);
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a&amp;b"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn login_form_keeps_next() {
        let html = render_login(Some("/profile?tab=1"), &[]);
        assert!(html.contains(r#"action="/auth/login?next=%2Fprofile%3Ftab%3D1""#));
    }

    #[test]
    fn profile_lists_public_fields_only() {
        let user = PublicUser {
            id: 7,
            username: "alice".into(),
            email: None,
            created_at: "2025-01-01T00:00:00Z".into(),
            status: "active".into(),
        };
        let html = render_profile(&user, &[]);
        assert!(html.contains("<dd>7</dd>"));
        assert!(html.contains("<dd>-</dd>"));
        assert!(!html.contains("pbkdf2"));
    }
}

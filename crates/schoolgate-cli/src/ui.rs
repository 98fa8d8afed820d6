//! Plain-text rendering of users, dashboards and navigation outcomes.

use std::fmt::Write;

use schoolgate_core::guard::{Navigation, Route};
use schoolgate_core::{DashboardKind, User};

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: Option<&str>, default: &str) -> String {
    value.unwrap_or(default).to_string()
}

pub fn render_user(user: &User) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", user.username, user.role().display_name());
    let _ = writeln!(out, "  id:         {}", user.id);
    let _ = writeln!(out, "  email:      {}", format_optional(user.email.as_deref(), "-"));
    let _ = writeln!(out, "  last login: {}", format_optional(user.last_login.as_deref(), "-"));
    for (key, value) in &user.profile {
        let value = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let _ = writeln!(out, "  {:<11} {}", format!("{}:", key), truncate_string(&value, 60));
    }
    out
}

pub fn render_dashboard(kind: DashboardKind, user: &User) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", kind.title());
    let _ = writeln!(out, "{}", "=".repeat(kind.title().len()));
    let _ = writeln!(out, "Welcome back, {}.", user.username);
    let _ = writeln!(out);
    let _ = writeln!(out, "Quick actions:");
    for (i, action) in kind.quick_actions().iter().enumerate() {
        let _ = writeln!(out, "  [{}] {:<18} {}", i + 1, action.label, action.path);
    }
    out
}

pub fn render_navigation(path: &str, navigation: Navigation) -> String {
    match navigation {
        Navigation::Loading => format!("{}: still loading the session", path),
        Navigation::Redirect(target) => format!("{}: redirected to {}", path, target),
        Navigation::Render(Route::NotFound) => format!("{}: page not found", path),
        Navigation::Render(route) => format!("{}: allowed ({})", path, route_label(route)),
    }
}

fn route_label(route: Route) -> String {
    match route {
        Route::Login => "sign-in".to_string(),
        Route::Dashboard => "dashboard".to_string(),
        Route::Area(role) => format!("{} area", role),
        Route::Unauthorized => "access denied".to_string(),
        Route::NotFound => "not found".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolgate_core::guard::LOGIN_PATH;
    use schoolgate_core::Role;
    use serde_json::json;

    fn teacher() -> User {
        serde_json::from_value(json!({
            "id": 2,
            "username": "ms.t",
            "role_type": "teacher",
            "department": "Science"
        }))
        .unwrap()
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("hello", 2), "he");
    }

    #[test]
    fn test_render_user_includes_profile_fields() {
        let text = render_user(&teacher());
        assert!(text.starts_with("ms.t (Teacher)"));
        assert!(text.contains("department: Science"));
        assert!(text.contains("email:      -"));
    }

    #[test]
    fn test_render_dashboard_lists_actions() {
        let text = render_dashboard(DashboardKind::Teacher, &teacher());
        assert!(text.starts_with("Teacher Dashboard\n"));
        assert!(text.contains("Take attendance"));
        assert!(text.contains("/teacher/attendance"));
    }

    #[test]
    fn test_render_navigation() {
        assert_eq!(
            render_navigation("/admin", Navigation::Redirect(LOGIN_PATH)),
            "/admin: redirected to /login"
        );
        assert_eq!(
            render_navigation("/teacher", Navigation::Render(Route::Area(Role::Teacher))),
            "/teacher: allowed (teacher area)"
        );
        assert_eq!(
            render_navigation("/zzz", Navigation::Render(Route::NotFound)),
            "/zzz: page not found"
        );
    }
}

//! Route protection.
//!
//! Every protected view is described by a [`RouteRule`]. [`evaluate`]
//! decides whether the current auth state may see it, and [`navigate`]
//! resolves a client path against the route table first.

use crate::auth::AuthSnapshot;
use crate::models::Role;

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Which roles may see a route. An empty role list admits any signed-in
/// user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRule {
    /// Exact path, or a prefix ending in `/*`.
    pub pattern: &'static str,
    pub allowed: &'static [Role],
}

impl RouteRule {
    pub const fn new(pattern: &'static str, allowed: &'static [Role]) -> Self {
        Self { pattern, allowed }
    }

    /// Whether `path` (already normalized) falls under this rule.
    pub fn matches(&self, path: &str) -> bool {
        match self.pattern.strip_suffix("/*") {
            Some(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            None => path == self.pattern,
        }
    }

    /// Restricted rules never admit `Role::Unknown`, even if listed.
    pub fn permits(&self, role: Role) -> bool {
        if self.allowed.is_empty() {
            return true;
        }
        role != Role::Unknown && self.allowed.contains(&role)
    }
}

/// Outcome of checking a protected route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// The persisted session has not been consulted yet.
    Loading,
    Render,
    RedirectToLogin,
    RedirectToUnauthorized,
}

/// Decide whether the current auth state may see a route.
pub fn evaluate(auth: &AuthSnapshot, rule: &RouteRule) -> GuardDecision {
    if !auth.hydrated {
        return GuardDecision::Loading;
    }
    match auth.role() {
        None => GuardDecision::RedirectToLogin,
        Some(role) if rule.permits(role) => GuardDecision::Render,
        Some(_) => GuardDecision::RedirectToUnauthorized,
    }
}

// ============================================================================
// Route table
// ============================================================================

/// A client-visible view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    /// A role's own area, e.g. `/teacher/classes`.
    Area(Role),
    Unauthorized,
    NotFound,
}

const ANY_ROLE: &[Role] = &[];

/// Admits nobody, see `RouteRule::permits`.
const NO_ROLE: &[Role] = &[Role::Unknown];

pub const DASHBOARD_RULE: RouteRule = RouteRule::new(DASHBOARD_PATH, ANY_ROLE);

/// Role areas, one per role.
pub const AREA_RULES: [(Role, RouteRule); 5] = [
    (Role::Admin, RouteRule::new("/admin/*", &[Role::Admin])),
    (Role::Teacher, RouteRule::new("/teacher/*", &[Role::Teacher])),
    (Role::Student, RouteRule::new("/student/*", &[Role::Student])),
    (Role::Parent, RouteRule::new("/parent/*", &[Role::Parent])),
    (Role::Staff, RouteRule::new("/staff/*", &[Role::Staff])),
];

impl Route {
    /// Resolve a path. Query strings, fragments and trailing slashes are
    /// ignored.
    pub fn resolve(path: &str) -> Route {
        let path = normalize(path);
        match path.as_str() {
            LOGIN_PATH => Route::Login,
            UNAUTHORIZED_PATH => Route::Unauthorized,
            p if DASHBOARD_RULE.matches(p) => Route::Dashboard,
            p => AREA_RULES
                .iter()
                .find(|(_, rule)| rule.matches(p))
                .map(|(role, _)| Route::Area(*role))
                .unwrap_or(Route::NotFound),
        }
    }

    /// The protection rule, `None` for public views.
    pub fn rule(&self) -> Option<RouteRule> {
        match self {
            Route::Dashboard => Some(DASHBOARD_RULE),
            Route::Area(role) => Some(
                AREA_RULES
                    .iter()
                    .find(|(r, _)| r == role)
                    .map(|(_, rule)| *rule)
                    .unwrap_or(RouteRule::new("/*", NO_ROLE)),
            ),
            Route::Login | Route::Unauthorized | Route::NotFound => None,
        }
    }
}

/// Final outcome of a navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Loading,
    Render(Route),
    Redirect(&'static str),
}

/// Resolve `path` and apply its guard.
pub fn navigate(path: &str, auth: &AuthSnapshot) -> Navigation {
    if normalize(path) == "/" {
        return Navigation::Redirect(DASHBOARD_PATH);
    }

    let route = Route::resolve(path);
    let Some(rule) = route.rule() else {
        return Navigation::Render(route);
    };

    match evaluate(auth, &rule) {
        GuardDecision::Loading => Navigation::Loading,
        GuardDecision::Render => Navigation::Render(route),
        GuardDecision::RedirectToLogin => Navigation::Redirect(LOGIN_PATH),
        GuardDecision::RedirectToUnauthorized => Navigation::Redirect(UNAUTHORIZED_PATH),
    }
}

fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

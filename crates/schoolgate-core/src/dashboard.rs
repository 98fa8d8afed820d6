//! Role to dashboard dispatch.
//!
//! Each role has exactly one dashboard. The match is exhaustive, so adding
//! a role to `Role` will not compile until it gets a dashboard or is sent to
//! sign-in.

use crate::guard::LOGIN_PATH;
use crate::models::{Role, Session};

/// A button on a dashboard that jumps to another view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickAction {
    pub label: &'static str,
    pub path: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardKind {
    Admin,
    Teacher,
    Student,
    Parent,
    Staff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardSelection {
    Show(DashboardKind),
    RedirectToLogin,
}

impl DashboardSelection {
    /// Where to go instead, if anywhere.
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            DashboardSelection::Show(_) => None,
            DashboardSelection::RedirectToLogin => Some(LOGIN_PATH),
        }
    }
}

impl DashboardKind {
    pub fn for_role(role: Role) -> Option<Self> {
        match role {
            Role::Admin => Some(DashboardKind::Admin),
            Role::Teacher => Some(DashboardKind::Teacher),
            Role::Student => Some(DashboardKind::Student),
            Role::Parent => Some(DashboardKind::Parent),
            Role::Staff => Some(DashboardKind::Staff),
            Role::Unknown => None,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            DashboardKind::Admin => Role::Admin,
            DashboardKind::Teacher => Role::Teacher,
            DashboardKind::Student => Role::Student,
            DashboardKind::Parent => Role::Parent,
            DashboardKind::Staff => Role::Staff,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DashboardKind::Admin => "Administrator Dashboard",
            DashboardKind::Teacher => "Teacher Dashboard",
            DashboardKind::Student => "Student Dashboard",
            DashboardKind::Parent => "Parent Dashboard",
            DashboardKind::Staff => "Staff Dashboard",
        }
    }

    /// Root of the role's own area.
    pub fn home_path(&self) -> &'static str {
        match self {
            DashboardKind::Admin => "/admin",
            DashboardKind::Teacher => "/teacher",
            DashboardKind::Student => "/student",
            DashboardKind::Parent => "/parent",
            DashboardKind::Staff => "/staff",
        }
    }

    pub fn quick_actions(&self) -> &'static [QuickAction] {
        match self {
            DashboardKind::Admin => &[
                QuickAction { label: "Manage users", path: "/admin/users" },
                QuickAction { label: "Classes", path: "/admin/classes" },
                QuickAction { label: "Fee structures", path: "/admin/fees" },
                QuickAction { label: "Announcements", path: "/admin/announcements" },
            ],
            DashboardKind::Teacher => &[
                QuickAction { label: "My classes", path: "/teacher/classes" },
                QuickAction { label: "Take attendance", path: "/teacher/attendance" },
                QuickAction { label: "Assignments", path: "/teacher/assignments" },
                QuickAction { label: "Enter grades", path: "/teacher/grades" },
            ],
            DashboardKind::Student => &[
                QuickAction { label: "My courses", path: "/student/enrollments" },
                QuickAction { label: "Grades", path: "/student/grades" },
                QuickAction { label: "Attendance", path: "/student/attendance" },
                QuickAction { label: "Report cards", path: "/student/report-cards" },
            ],
            DashboardKind::Parent => &[
                QuickAction { label: "Children", path: "/parent/children" },
                QuickAction { label: "Progress reports", path: "/parent/reports" },
                QuickAction { label: "Fees & payments", path: "/parent/payments" },
            ],
            DashboardKind::Staff => &[
                QuickAction { label: "Library", path: "/staff/library" },
                QuickAction { label: "Inventory", path: "/staff/inventory" },
                QuickAction { label: "Transport", path: "/staff/transport" },
                QuickAction { label: "Events", path: "/staff/events" },
            ],
        }
    }
}

/// Pick the dashboard for the signed-in user.
pub fn select_dashboard(session: Option<&Session>) -> DashboardSelection {
    session
        .and_then(|s| DashboardKind::for_role(s.role()))
        .map(DashboardSelection::Show)
        .unwrap_or(DashboardSelection::RedirectToLogin)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::guard::{Navigation, Route};
    use crate::models::User;

    fn session(role: &str) -> Session {
        let user: User = serde_json::from_value(json!({
            "id": 3,
            "username": "u",
            "role_type": role
        }))
        .unwrap();
        Session::new("t", user)
    }

    #[test]
    fn test_each_role_gets_its_dashboard() {
        for role in Role::ALL {
            let selection = select_dashboard(Some(&session(role.as_str())));
            let DashboardSelection::Show(kind) = selection else {
                panic!("{} should have a dashboard", role);
            };
            assert_eq!(kind.role(), role);
        }
    }

    #[test]
    fn test_unknown_role_and_no_session_go_to_login() {
        assert_eq!(
            select_dashboard(Some(&session("janitor"))),
            DashboardSelection::RedirectToLogin
        );
        assert_eq!(select_dashboard(None), DashboardSelection::RedirectToLogin);
        assert_eq!(DashboardSelection::RedirectToLogin.redirect(), Some(LOGIN_PATH));
    }

    #[test]
    fn test_quick_actions_stay_in_own_area() {
        for role in Role::ALL {
            let kind = DashboardKind::for_role(role).unwrap();
            assert!(!kind.quick_actions().is_empty());
            for qa in kind.quick_actions() {
                assert_eq!(Route::resolve(qa.path), Route::Area(role), "{}", qa.path);
            }
            assert_eq!(Route::resolve(kind.home_path()), Route::Area(role));
        }
    }

    #[test]
    fn test_quick_actions_outlive_the_kind() {
        let actions: &'static [QuickAction] = {
            let kind = DashboardKind::Admin;
            kind.quick_actions()
        };
        assert_eq!(actions[0], QuickAction { label: "Manage users", path: "/admin/users" });
        assert_eq!(DashboardKind::Parent.quick_actions().len(), 3);
    }

    #[test]
    fn test_quick_actions_pass_the_guard_for_owner() {
        let owner = crate::auth::AuthSnapshot {
            hydrated: true,
            loading: false,
            session: Some(session("teacher")),
        };
        for qa in DashboardKind::Teacher.quick_actions() {
            assert!(matches!(crate::guard::navigate(qa.path, &owner), Navigation::Render(_)));
        }
    }
}

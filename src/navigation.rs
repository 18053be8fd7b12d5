use crate::{
    models::NavItem,
    roles::{Role, RoutePattern, RouteTable},
};

struct SidebarEntry {
    label: &'static str,
    path: &'static str,
}

const SIDEBAR: &[SidebarEntry] = &[
    SidebarEntry { label: "Home", path: "/home" },
    SidebarEntry { label: "Courses", path: "/courses" },
    SidebarEntry { label: "My Courses", path: "/mycourses" },
    SidebarEntry { label: "Course Management", path: "/coursemanagement" },
    SidebarEntry { label: "Users", path: "/users" },
    SidebarEntry { label: "Approve", path: "/approve" },
];

/// navigation_for
///
/// The sidebar as `role` sees it: only entries the route table lets the role enter, so the
/// menu never links to a page the gate would refuse.
pub fn navigation_for(table: &RouteTable, role: Role, current_path: &str) -> Vec<NavItem> {
    SIDEBAR
        .iter()
        .filter(|entry| table.allows(role, entry.path))
        .map(|entry| NavItem {
            label: entry.label.to_string(),
            path: entry.path.to_string(),
            active: RoutePattern::parse(entry.path)
                .map(|pattern| pattern.matches(current_path))
                .unwrap_or(false),
        })
        .collect()
}

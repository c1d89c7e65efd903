//! Static RBAC tables for the dashboard.
//!
//! Two distinct grants exist on purpose: *sections* control which dashboard
//! pages a role may see, *actions* control what a role may do inside a page a
//! role can already see. Both tables are process-wide constants, loaded once
//! and never mutated, so they are safe to consult from any request without
//! synchronization.

/// Pseudo-section marking a route that requires no session at all.
/// The guard middleware skips any path that resolves to it.
pub const PUBLIC_SECTION: &str = "public";

/// Plan identifier meaning "no active subscription".
pub const NO_PLAN: &str = "no-plan";

/// sections_for_role
///
/// The role→section table. Unknown roles get the empty set rather than an error,
/// which makes every downstream check fail closed.
pub fn sections_for_role(role: &str) -> &'static [&'static str] {
    match role {
        "admin" => &[
            "overview",
            "upload",
            "databases",
            "plans",
            "users",
            "logs",
            "support",
        ],
        "staff" => &["overview", "upload", "databases", "logs", "support"],
        "dev" => &["overview", "upload", "databases", "logs"],
        "support" => &["overview", "support", "logs"],
        "user" => &["overview", "upload", "databases"],
        _ => &[],
    }
}

/// actions_for_role
///
/// The role→action table, deliberately separate from sections: a role may see
/// a page yet lack a capability within it (e.g. 'user' sees the upload page
/// but cannot deploy).
pub fn actions_for_role(role: &str) -> &'static [&'static str] {
    match role {
        "admin" => &[
            "deploy_apps",
            "restart_apps",
            "delete_apps",
            "manage_users",
            "view_logs",
        ],
        "staff" => &["deploy_apps", "restart_apps", "view_logs"],
        "dev" => &["deploy_apps", "restart_apps", "view_logs"],
        "support" => &["view_logs"],
        "user" => &["restart_apps"],
        _ => &[],
    }
}

/// has_section_permission
///
/// Returns true iff `section` is a member of the set associated with `role`.
/// Unknown role or unknown section yields false, never an error.
pub fn has_section_permission(role: &str, section: &str) -> bool {
    sections_for_role(role).contains(&section)
}

/// has_action_permission
///
/// The analogous membership check against the action table.
pub fn has_action_permission(role: &str, action: &str) -> bool {
    actions_for_role(role).contains(&action)
}

/// can_deploy
///
/// Composes capability and billing: deploying requires the `deploy_apps` action
/// grant AND an active plan. Absence of either denies.
pub fn can_deploy(role: &str, plan: &str) -> bool {
    has_action_permission(role, "deploy_apps") && plan != NO_PLAN
}

/// required_section
///
/// The route→section map: one section per dashboard path. Paths outside the
/// dashboard resolve to the `public` pseudo-section, meaning no guard applies.
pub fn required_section(path: &str) -> &'static str {
    match path {
        "/dashboard" | "/dashboard/" => "overview",
        "/dashboard/upload" => "upload",
        "/dashboard/databases" => "databases",
        "/dashboard/plans" => "plans",
        "/dashboard/users" => "users",
        "/dashboard/logs" => "logs",
        "/dashboard/support" => "support",
        _ => PUBLIC_SECTION,
    }
}

/// All dashboard paths covered by the route map, used by the startup validation.
const MAPPED_PATHS: &[&str] = &[
    "/dashboard",
    "/dashboard/upload",
    "/dashboard/databases",
    "/dashboard/plans",
    "/dashboard/users",
    "/dashboard/logs",
    "/dashboard/support",
];

/// Roles known to the tables, used by the startup validation.
const KNOWN_ROLES: &[&str] = &["admin", "staff", "dev", "support", "user"];

/// validate_tables
///
/// Consistency check run once at startup: every section the route map demands
/// must be reachable by at least one role, otherwise that page can never render
/// for anyone. Mismatches are logged as warnings and returned for inspection;
/// this is an operator aid, not an enforcement point.
pub fn validate_tables() -> Vec<&'static str> {
    let mut orphaned = Vec::new();
    for path in MAPPED_PATHS.iter().copied() {
        let section = required_section(path);
        if section == PUBLIC_SECTION {
            continue;
        }
        let granted_somewhere = KNOWN_ROLES
            .iter()
            .any(|role| has_section_permission(role, section));
        if !granted_somewhere && !orphaned.contains(&section) {
            tracing::warn!(
                section,
                path,
                "route map references a section no role is granted"
            );
            orphaned.push(section);
        }
    }
    orphaned
}

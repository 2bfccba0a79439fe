/// Roles an agent can act on. Always referenced.
pub const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "link",
    "textbox",
    "checkbox",
    "radio",
    "combobox",
    "listbox",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "option",
    "searchbox",
    "slider",
    "spinbutton",
    "switch",
    "tab",
    "treeitem",
];

/// Roles worth referencing when they carry a name.
pub const CONTENT_ROLES: &[&str] = &[
    "heading",
    "cell",
    "gridcell",
    "columnheader",
    "rowheader",
    "listitem",
    "article",
    "region",
    "main",
    "navigation",
];

/// Layout containers; never referenced.
pub const STRUCTURAL_ROLES: &[&str] = &[
    "generic",
    "group",
    "list",
    "table",
    "row",
    "rowgroup",
    "grid",
    "treegrid",
    "menu",
    "menubar",
    "toolbar",
    "tablist",
    "tree",
    "directory",
    "document",
    "application",
    "presentation",
    "none",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleClass {
    Interactive,
    Content,
    Structural,
    Other,
}

pub fn role_class(role: &str) -> RoleClass {
    if INTERACTIVE_ROLES.contains(&role) {
        RoleClass::Interactive
    } else if CONTENT_ROLES.contains(&role) {
        RoleClass::Content
    } else if STRUCTURAL_ROLES.contains(&role) {
        RoleClass::Structural
    } else {
        RoleClass::Other
    }
}

pub fn is_interactive(role: &str) -> bool {
    role_class(role) == RoleClass::Interactive
}

/// Interactive roles always get a ref; content roles only when named.
pub fn receives_ref(role: &str, has_name: bool) -> bool {
    match role_class(role) {
        RoleClass::Interactive => true,
        RoleClass::Content => has_name,
        RoleClass::Structural | RoleClass::Other => false,
    }
}

//! Find the token in a fresh table that stands for an element of an older one.

use relink_common::refs::ReferenceTable;

/// Match an old `(role, name)` pair against a new table.
///
/// 1. exact `(role, name)`;
/// 2. with a name: same role, either name containing the other (dynamic
///    fragments such as counters or timestamps). Several candidates are
///    ranked by string similarity;
/// 3. the single entry with the same role. Two or more role-only candidates
///    give `None`.
pub fn rematch(table: &ReferenceTable, old_role: &str, old_name: Option<&str>) -> Option<String> {
    if let Some((token, _)) = table
        .iter()
        .find(|(_, r)| r.role == old_role && r.name.as_deref() == old_name)
    {
        return Some(token.to_string());
    }

    if let Some(old) = old_name.filter(|n| !n.is_empty()) {
        let best = table
            .iter()
            .filter(|(_, r)| r.role == old_role)
            .filter_map(|(token, r)| {
                let name = r.name.as_deref().filter(|n| !n.is_empty())?;
                (name.contains(old) || old.contains(name))
                    .then(|| (token, strsim::normalized_levenshtein(old, name)))
            })
            .fold(None::<(&str, f64)>, |best, candidate| match best {
                Some((_, score)) if score >= candidate.1 => best,
                _ => Some(candidate),
            });

        if let Some((token, _)) = best {
            return Some(token.to_string());
        }
    }

    let mut same_role = table.iter().filter(|(_, r)| r.role == old_role);
    match (same_role.next(), same_role.next()) {
        (Some((token, _)), None) => Some(token.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relink_common::refs::{RefMode, RoleRef};

    fn table(entries: &[(&str, &str, Option<&str>)]) -> ReferenceTable {
        let mut table = ReferenceTable::new(RefMode::Role);
        for (token, role, name) in entries {
            table.insert(*token, RoleRef::new(*role, name.map(str::to_string)));
        }
        table
    }

    #[test]
    fn exact_match() {
        let refs = table(&[
            ("e1", "button", Some("Submit")),
            ("e2", "button", Some("Cancel")),
        ]);
        assert_eq!(rematch(&refs, "button", Some("Submit")), Some("e1".into()));
        assert_eq!(rematch(&refs, "button", Some("Cancel")), Some("e2".into()));
    }

    #[test]
    fn unique_role_fallback() {
        let refs = table(&[("e1", "button", Some("Submit")), ("e2", "link", None)]);
        assert_eq!(rematch(&refs, "link", None), Some("e2".into()));
    }

    #[test]
    fn ambiguous_role_only_gives_none() {
        let refs = table(&[("e1", "link", None), ("e2", "link", None), ("e3", "button", None)]);
        assert_eq!(rematch(&refs, "link", Some("Gone")), None);
        assert_eq!(
            rematch(&table(&[("e1", "textbox", None), ("e2", "textbox", None)]), "textbox", Some("x")),
            None
        );
    }

    #[test]
    fn fuzzy_match_in_both_directions() {
        let refs = table(&[
            ("e1", "button", Some("Cart (3)")),
            ("e2", "link", Some("Cart")),
        ]);
        assert_eq!(rematch(&refs, "button", Some("Cart")), Some("e1".into()));
        assert_eq!(rematch(&refs, "link", Some("Cart (2)")), Some("e2".into()));
    }

    #[test]
    fn fuzzy_prefers_closest_name() {
        let refs = table(&[
            ("e1", "link", Some("Inbox - 1204 unread messages")),
            ("e2", "link", Some("Inbox (4)")),
        ]);
        assert_eq!(rematch(&refs, "link", Some("Inbox")), Some("e2".into()));
    }

    #[test]
    fn role_must_match() {
        let refs = table(&[("e1", "link", Some("Submit"))]);
        assert_eq!(rematch(&refs, "button", Some("Submit")), None);
    }
}

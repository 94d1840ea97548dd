use crate::types::ColumnSchema;
use std::collections::HashMap;
use tracing::warn;

/// Heuristic foreign-key resolution over a snapshot's columns.
///
/// Columns that already carry an authoritative `foreign_key_to` (from a
/// PostgREST hint or a catalog constraint) are left alone. For the rest,
/// a column is a FK candidate iff it is a uuid, its name ends in `_id`,
/// and it is not itself named `id`. The referenced table is guessed by
/// trying pluralization variants of the stripped base name against the
/// known table set; first match wins. A miss leaves the column untouched
/// and logs a warning, nothing more.
pub fn resolve_foreign_keys(columns: &mut [ColumnSchema], table_names: &[String]) {
    // Case-insensitive lookup preserving the canonical table name.
    let lookup: HashMap<String, &str> = table_names
        .iter()
        .map(|name| (name.to_lowercase(), name.as_str()))
        .collect();

    for column in columns.iter_mut() {
        if column.foreign_key_to.is_some() || !is_fk_candidate(column) {
            continue;
        }
        let base = column
            .column_name
            .strip_suffix("_id")
            .unwrap_or(&column.column_name);
        match guess_target_table(base, &lookup) {
            Some(table) => {
                column.foreign_key_to = Some(format!("{table}.id"));
            }
            None => {
                warn!(
                    table = %column.table_name,
                    column = %column.column_name,
                    "no table matched any pluralization of '{base}'"
                );
            }
        }
    }
}

fn is_fk_candidate(column: &ColumnSchema) -> bool {
    column.data_type == "uuid"
        && column.column_name != "id"
        && column.column_name.ends_with("_id")
}

/// Try each pluralization variant of `base` in fixed order and return the
/// first known table it names.
fn guess_target_table<'a>(base: &str, lookup: &HashMap<String, &'a str>) -> Option<&'a str> {
    for variant in pluralization_variants(base) {
        if let Some(table) = lookup.get(&variant.to_lowercase()) {
            return Some(table);
        }
    }
    None
}

/// Candidate table names for a stripped FK base name, in the precedence
/// order the resolver tries them. Best-effort English, nothing more.
pub fn pluralization_variants(base: &str) -> Vec<String> {
    let mut variants = vec![base.to_string(), format!("{base}s")];

    if let Some(stem) = base.strip_suffix('y') {
        variants.push(format!("{stem}ies"));
    }
    if base.ends_with('s') {
        variants.push(format!("{base}es"));
    }
    if base.ends_with("ch") {
        variants.push(format!("{base}es"));
    }
    if base.ends_with("sh") {
        variants.push(format!("{base}es"));
    }
    if base.ends_with('x') {
        variants.push(format!("{base}es"));
    }
    if base.ends_with('z') {
        variants.push(format!("{base}es"));
    }
    if let Some(stem) = base.strip_suffix("fe") {
        variants.push(format!("{stem}ves"));
    } else if let Some(stem) = base.strip_suffix('f') {
        variants.push(format!("{stem}ves"));
    }
    if let Some(stem) = base.strip_suffix("us") {
        variants.push(format!("{stem}i"));
    }
    if let Some(stem) = base.strip_suffix("is") {
        variants.push(format!("{stem}es"));
    }
    if let Some(stem) = base.strip_suffix("on") {
        variants.push(format!("{stem}a"));
    }
    variants.push(format!("{base}es"));

    match base {
        "man" => variants.push("men".to_string()),
        "woman" => variants.push("women".to_string()),
        "person" => variants.push("people".to_string()),
        "child" => variants.push("children".to_string()),
        _ => {}
    }

    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid_column(table: &str, name: &str) -> ColumnSchema {
        ColumnSchema {
            schema: "public".to_string(),
            table_name: table.to_string(),
            column_name: name.to_string(),
            data_type: "uuid".to_string(),
            is_nullable: true,
            column_default: None,
            is_primary_key: false,
            foreign_key_to: None,
            indexed: false,
            last_used_at: None,
        }
    }

    fn tables(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_plain_plural() {
        let mut columns = vec![uuid_column("posts", "user_id")];
        resolve_foreign_keys(&mut columns, &tables(&["users", "posts"]));
        assert_eq!(columns[0].foreign_key_to.as_deref(), Some("users.id"));
    }

    #[test]
    fn resolves_y_to_ies() {
        let mut columns = vec![uuid_column("posts", "category_id")];
        resolve_foreign_keys(&mut columns, &tables(&["categories"]));
        assert_eq!(columns[0].foreign_key_to.as_deref(), Some("categories.id"));
    }

    #[test]
    fn resolves_ch_to_ches() {
        // "batch" + s = "batchs" misses; the ch->ches variant must hit.
        let mut columns = vec![uuid_column("jobs", "batch_id")];
        resolve_foreign_keys(&mut columns, &tables(&["batches"]));
        assert_eq!(columns[0].foreign_key_to.as_deref(), Some("batches.id"));
    }

    #[test]
    fn resolves_s_to_ses() {
        let mut columns = vec![uuid_column("orders", "address_id")];
        resolve_foreign_keys(&mut columns, &tables(&["addresses"]));
        assert_eq!(columns[0].foreign_key_to.as_deref(), Some("addresses.id"));
    }

    #[test]
    fn resolves_irregulars() {
        let mut columns = vec![
            uuid_column("notes", "person_id"),
            uuid_column("notes", "child_id"),
        ];
        resolve_foreign_keys(&mut columns, &tables(&["people", "children"]));
        assert_eq!(columns[0].foreign_key_to.as_deref(), Some("people.id"));
        assert_eq!(columns[1].foreign_key_to.as_deref(), Some("children.id"));
    }

    #[test]
    fn singular_table_name_matches_first() {
        // "user" itself is tried before "users".
        let mut columns = vec![uuid_column("posts", "user_id")];
        resolve_foreign_keys(&mut columns, &tables(&["user", "users"]));
        assert_eq!(columns[0].foreign_key_to.as_deref(), Some("user.id"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let mut columns = vec![uuid_column("posts", "user_id")];
        resolve_foreign_keys(&mut columns, &tables(&["Users"]));
        assert_eq!(columns[0].foreign_key_to.as_deref(), Some("Users.id"));
    }

    #[test]
    fn miss_leaves_column_unresolved() {
        let mut columns = vec![uuid_column("posts", "widget_id")];
        resolve_foreign_keys(&mut columns, &tables(&["users"]));
        assert_eq!(columns[0].foreign_key_to, None);
    }

    #[test]
    fn non_candidates_are_skipped() {
        let mut non_uuid = uuid_column("posts", "author_id");
        non_uuid.data_type = "text".to_string();
        let mut columns = vec![
            uuid_column("users", "id"),
            non_uuid,
            uuid_column("posts", "author"),
        ];
        resolve_foreign_keys(&mut columns, &tables(&["users", "authors", "ids"]));
        assert!(columns.iter().all(|c| c.foreign_key_to.is_none()));
    }

    #[test]
    fn authoritative_resolution_is_not_overwritten() {
        let mut column = uuid_column("posts", "user_id");
        column.foreign_key_to = Some("accounts.id".to_string());
        let mut columns = vec![column];
        resolve_foreign_keys(&mut columns, &tables(&["users"]));
        assert_eq!(columns[0].foreign_key_to.as_deref(), Some("accounts.id"));
    }

    #[test]
    fn variant_order_is_fixed() {
        let variants = pluralization_variants("category");
        assert_eq!(variants[0], "category");
        assert_eq!(variants[1], "categorys");
        assert_eq!(variants[2], "categories");
    }
}

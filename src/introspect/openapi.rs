use crate::types::ColumnSchema;
use serde_json::Value;
use tracing::debug;

/// Extract table names from the OpenAPI root document's `paths` section.
///
/// Every top-level path key, stripped of its leading slash, is a table;
/// templated paths (containing `{`) and the bare root are skipped. Order
/// is the server-provided order, not sorted.
pub fn list_tables(doc: &Value) -> Vec<String> {
    let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };

    paths
        .keys()
        .filter(|path| !path.contains('{'))
        .map(|path| path.trim_start_matches('/').to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Map the `definitions` section to columns for the listed tables.
///
/// Tables absent from definitions simply contribute no columns; the
/// caller treats that as a partial snapshot, not a failure.
pub fn map_columns(doc: &Value, tables: &[String]) -> Vec<ColumnSchema> {
    let Some(definitions) = doc.get("definitions").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut columns = Vec::new();
    for table in tables {
        let Some(definition) = definitions.get(table) else {
            debug!(table = %table, "table has no definition entry");
            continue;
        };
        let Some(properties) = definition.get("properties").and_then(Value::as_object) else {
            continue;
        };
        let required: Vec<&str> = definition
            .get("required")
            .and_then(Value::as_array)
            .map(|req| req.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        for (column_name, descriptor) in properties {
            let description = descriptor.get("description").and_then(Value::as_str);
            columns.push(ColumnSchema {
                schema: "public".to_string(),
                table_name: table.clone(),
                column_name: column_name.clone(),
                data_type: map_type(descriptor),
                is_nullable: !required.contains(&column_name.as_str()),
                column_default: descriptor.get("default").map(render_default),
                // Name-based heuristic; overridden later when a pk hint or
                // real constraint metadata is available.
                is_primary_key: column_name == "id"
                    || description.is_some_and(|d| d.contains("<pk/>")),
                foreign_key_to: description.and_then(parse_fk_hint),
                indexed: false,
                last_used_at: None,
            });
        }
    }
    columns
}

/// Map a JSON-Schema-ish property descriptor to a coarse Postgres type
/// name. Precedence is fixed; unknown shapes fall through to "unknown".
pub fn map_type(descriptor: &Value) -> String {
    let ty = descriptor.get("type").and_then(Value::as_str).unwrap_or("");
    let format = descriptor.get("format").and_then(Value::as_str).unwrap_or("");

    match ty {
        "integer" => {
            if format.contains("int8") || format.contains("bigint") {
                "bigint".to_string()
            } else {
                "integer".to_string()
            }
        }
        "string" => {
            if format.contains("uuid") {
                "uuid".to_string()
            } else if format.contains("date-time") || format.contains("timestamp") {
                "timestamp with time zone".to_string()
            } else if format == "date" {
                "date".to_string()
            } else if format.starts_with("time") {
                "time".to_string()
            } else if let Some(max) = descriptor.get("maxLength").and_then(Value::as_u64) {
                format!("varchar({max})")
            } else {
                "text".to_string()
            }
        }
        "boolean" => "boolean".to_string(),
        "object" => "jsonb".to_string(),
        "array" => match descriptor.get("items") {
            Some(items) if items.is_object() => format!("{}[]", map_type(items)),
            _ => "array".to_string(),
        },
        _ => "unknown".to_string(),
    }
}

/// PostgREST embeds relationship hints in property descriptions:
/// `Note: This is a Foreign Key to \`categories.id\`.<fk table='categories' column='id'/>`.
/// When present, this is authoritative and skips the pluralization guess.
pub fn parse_fk_hint(description: &str) -> Option<String> {
    let tag = description.split("<fk ").nth(1)?;
    let table = attr_value(tag, "table")?;
    let column = attr_value(tag, "column")?;
    Some(format!("{table}.{column}"))
}

fn attr_value(tag: &str, attr: &str) -> Option<String> {
    let rest = tag.split(&format!("{attr}='")).nth(1)?;
    let end = rest.find('\'')?;
    Some(rest[..end].to_string())
}

fn render_default(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "paths": {
                "/": {},
                "/users": {},
                "/posts": {},
                "/rpc/{fn}": {},
                "/comments": {}
            },
            "definitions": {
                "users": {
                    "required": ["id"],
                    "properties": {
                        "id": {"type": "string", "format": "uuid",
                               "description": "Note:\nThis is a Primary Key.<pk/>"},
                        "email": {"type": "string", "maxLength": 255},
                        "bio": {"type": "string"}
                    }
                },
                "posts": {
                    "required": ["id", "user_id"],
                    "properties": {
                        "id": {"type": "string", "format": "uuid"},
                        "user_id": {
                            "type": "string", "format": "uuid",
                            "description": "Note:\nThis is a Foreign Key to `users.id`.<fk table='users' column='id'/>"
                        },
                        "views": {"type": "integer", "format": "int8"},
                        "rank": {"type": "integer", "format": "int4"},
                        "published": {"type": "boolean"},
                        "meta": {"type": "object"},
                        "tags": {"type": "array", "items": {"type": "string"}},
                        "scores": {"type": "array"},
                        "created_at": {"type": "string", "format": "timestamp with time zone"},
                        "birthday": {"type": "string", "format": "date"},
                        "alarm": {"type": "string", "format": "time without time zone"},
                        "mystery": {"type": "number"}
                    }
                }
            }
        })
    }

    #[test]
    fn lists_path_keys_in_order_excluding_templates() {
        let tables = list_tables(&doc());
        assert_eq!(tables, vec!["users", "posts", "comments"]);
    }

    #[test]
    fn missing_paths_section_yields_empty_list() {
        assert!(list_tables(&json!({})).is_empty());
        assert!(list_tables(&json!({"paths": 7})).is_empty());
    }

    #[test]
    fn type_mapping_precedence() {
        let doc = doc();
        let tables = vec!["posts".to_string()];
        let columns = map_columns(&doc, &tables);
        let ty = |name: &str| {
            columns
                .iter()
                .find(|c| c.column_name == name)
                .map(|c| c.data_type.clone())
                .unwrap()
        };
        assert_eq!(ty("id"), "uuid");
        assert_eq!(ty("views"), "bigint");
        assert_eq!(ty("rank"), "integer");
        assert_eq!(ty("published"), "boolean");
        assert_eq!(ty("meta"), "jsonb");
        assert_eq!(ty("tags"), "text[]");
        assert_eq!(ty("scores"), "array");
        assert_eq!(ty("created_at"), "timestamp with time zone");
        assert_eq!(ty("birthday"), "date");
        assert_eq!(ty("alarm"), "time");
        assert_eq!(ty("mystery"), "unknown");
    }

    #[test]
    fn varchar_carries_max_length() {
        let columns = map_columns(&doc(), &["users".to_string()]);
        let email = columns.iter().find(|c| c.column_name == "email").unwrap();
        assert_eq!(email.data_type, "varchar(255)");
        assert_eq!(
            columns
                .iter()
                .find(|c| c.column_name == "bio")
                .unwrap()
                .data_type,
            "text"
        );
    }

    #[test]
    fn nullability_is_negation_of_required() {
        let columns = map_columns(&doc(), &["users".to_string()]);
        let id = columns.iter().find(|c| c.column_name == "id").unwrap();
        let bio = columns.iter().find(|c| c.column_name == "bio").unwrap();
        assert!(!id.is_nullable);
        assert!(bio.is_nullable);
    }

    #[test]
    fn primary_key_by_name_or_hint() {
        let columns = map_columns(&doc(), &["users".to_string(), "posts".to_string()]);
        assert!(columns
            .iter()
            .filter(|c| c.column_name == "id")
            .all(|c| c.is_primary_key));
        assert!(!columns
            .iter()
            .find(|c| c.column_name == "email")
            .unwrap()
            .is_primary_key);
    }

    #[test]
    fn fk_hint_is_parsed_from_description() {
        let columns = map_columns(&doc(), &["posts".to_string()]);
        let user_id = columns.iter().find(|c| c.column_name == "user_id").unwrap();
        assert_eq!(user_id.foreign_key_to.as_deref(), Some("users.id"));
    }

    #[test]
    fn fk_hint_rejects_malformed_tags() {
        assert_eq!(parse_fk_hint("no tag here"), None);
        assert_eq!(parse_fk_hint("<fk table='users'/>"), None);
    }
}

//! Terminal tables for hub responses.

use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Render row objects as a table. Columns are the union of keys in order of
/// first appearance; missing keys and nulls print as empty cells.
pub fn records(rows: &[Value]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }
    }

    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_string()));
    for row in rows {
        builder.push_record(columns.iter().map(|c| cell(row.get(*c))));
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

pub fn datasets(list: &[Value]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["name", "rows", "take", "columns", "aliases"].map(String::from));
    for ds in list {
        let columns = names(ds.get("columns"), |c| c.get("name").and_then(Value::as_str));
        let aliases = match ds.get("aliases") {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| format!("{}→{}", k, v.as_str().unwrap_or_default()))
                .collect::<Vec<_>>()
                .join(", "),
            _ => String::new(),
        };
        builder.push_record([
            cell(ds.get("name")),
            cell(ds.get("rows")),
            format!("{}/{}", cell(ds.get("default_take")), cell(ds.get("max_take"))),
            columns,
            aliases,
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

fn names<'a>(list: Option<&'a Value>, name: impl Fn(&'a Value) -> Option<&'a str>) -> String {
    list.and_then(Value::as_array)
        .map(|items| items.iter().filter_map(name).collect::<Vec<_>>().join(", "))
        .unwrap_or_default()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_union_of_columns() {
        let out = records(&[
            json!({"id": 1, "name": "Hannah"}),
            json!({"id": 2, "email": null}),
        ]);
        let header = out.lines().nth(1).unwrap();
        let id = header.find("id").unwrap();
        let name = header.find("name").unwrap();
        let email = header.find("email").unwrap();
        assert!(id < name && name < email);
        assert!(out.contains("Hannah"));
        assert!(!out.contains("null"));
    }

    #[test]
    fn test_datasets_table() {
        let out = datasets(&[json!({
            "name": "users",
            "rows": 8,
            "columns": [{"name": "id", "type": "integer"}, {"name": "name", "type": "text"}],
            "aliases": {"email": "user.email"},
            "default_take": 20,
            "max_take": 50
        })]);
        assert!(out.contains("users"));
        assert!(out.contains("20/50"));
        assert!(out.contains("id, name"));
        assert!(out.contains("email→user.email"));
    }
}

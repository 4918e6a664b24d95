//! Collection title composition.

use serde_json::Value;

/// Human-friendly collection title: the collection's `name`, suffixed with
/// the nearest named ancestor as `"{name} -- (from {ancestor})"` when one
/// exists. Ancestor entries may be objects (`name`/`title`) or bare strings.
pub fn collection_title(collection: &Value) -> String {
    let name = collection
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let ancestor = collection
        .get("ancestors")
        .and_then(Value::as_array)
        .and_then(|a| a.last())
        .and_then(|last| match last {
            Value::Object(map) => map
                .get("name")
                .or_else(|| map.get("title"))
                .and_then(Value::as_str),
            Value::String(s) => Some(s.as_str()),
            _ => None,
        })
        .unwrap_or_default();

    if !name.is_empty() && !ancestor.is_empty() {
        format!("{name} -- (from {ancestor})")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn composes_with_nearest_ancestor() {
        let coll = json!({
            "name": "Theses and Dissertations",
            "ancestors": [
                { "name": "Brown University Library" },
                { "name": "Computer Science" }
            ]
        });
        assert_eq!(
            collection_title(&coll),
            "Theses and Dissertations -- (from Computer Science)"
        );
    }

    #[test]
    fn bare_name_without_ancestors() {
        assert_eq!(collection_title(&json!({ "name": "Theses" })), "Theses");
        assert_eq!(
            collection_title(&json!({ "name": "Theses", "ancestors": [] })),
            "Theses"
        );
    }

    #[test]
    fn ancestor_title_field_and_string_form() {
        let coll = json!({
            "name": "Theses",
            "ancestors": [{ "title": "CS Dept" }]
        });
        assert_eq!(collection_title(&coll), "Theses -- (from CS Dept)");

        let coll = json!({
            "name": "Theses",
            "ancestors": ["CS Dept"]
        });
        assert_eq!(collection_title(&coll), "Theses -- (from CS Dept)");
    }

    #[test]
    fn empty_when_name_missing() {
        assert_eq!(collection_title(&json!({})), "");
        // an ancestor alone does not make a title
        assert_eq!(
            collection_title(&json!({ "ancestors": [{ "name": "X" }] })),
            ""
        );
    }
}

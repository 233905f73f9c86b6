//! Eager-load spec validation, run when a projector is built.
//!
//! The spec arrives as JSON so that configuration files can carry it.
//! Accepted shapes, checked by recursive descent:
//! - `"relation"`: a relation name (a leaf),
//! - `{ "relation": <spec> }`: relation names mapped to nested specs,
//! - `[<spec>, ...]`: a list of specs.
//!
//! The top level must be a list (or `null` for "no eager loading").

use serde_json::Value;

use store::Include;

use crate::schema::is_identifier;
use crate::ProjectorError;

/// Validate a JSON eager-load spec and convert it into [`Include`] nodes.
///
/// # Errors
/// [`ProjectorError::InvalidIncludes`] naming the offending position if any
/// leaf or mapping key is not a relation name.
pub fn parse_includes(spec: &Value) -> Result<Vec<Include>, ProjectorError> {
    match spec {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_node(item, &format!("includes[{i}]")))
            .collect(),
        other => Err(invalid("includes", format!("expected a list, found {other}"))),
    }
}

fn parse_node(node: &Value, path: &str) -> Result<Include, ProjectorError> {
    match node {
        Value::String(name) => {
            check_relation_name(name, path)?;
            Ok(Include::Relation(name.clone()))
        }
        Value::Object(map) => {
            let entries = map
                .iter()
                .map(|(name, inner)| -> Result<(String, Include), ProjectorError> {
                    check_relation_name(name, path)?;
                    let inner = parse_node(inner, &format!("{path}.{name}"))?;
                    Ok((name.clone(), inner))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Include::Nested(entries))
        }
        Value::Array(items) => {
            let items = items
                .iter()
                .enumerate()
                .map(|(i, item)| parse_node(item, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, ProjectorError>>()?;
            Ok(Include::List(items))
        }
        other => Err(invalid(path, format!("expected a relation name, found {other}"))),
    }
}

fn check_relation_name(name: &str, path: &str) -> Result<(), ProjectorError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(invalid(path, format!("'{name}' is not a relation name")))
    }
}

fn invalid(path: &str, reason: String) -> ProjectorError {
    ProjectorError::InvalidIncludes {
        path: path.to_owned(),
        reason,
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn symbols_maps_and_lists_are_accepted() {
        let includes = parse_includes(&json!(["address", { "books": "publisher" }])).unwrap();
        assert_eq!(
            includes,
            vec![
                Include::relation("address"),
                Include::nested("books", Include::relation("publisher")),
            ]
        );
    }

    #[test]
    fn deeply_nested_specs_are_accepted() {
        let spec = json!([{ "books": [{ "publisher": "address" }, "author"] }, []]);
        let includes = parse_includes(&spec).unwrap();
        assert_eq!(includes.len(), 2);
        assert_eq!(includes[1], Include::List(vec![]));
    }

    #[test]
    fn null_means_no_includes() {
        assert!(parse_includes(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn top_level_must_be_a_list() {
        assert!(parse_includes(&json!("address")).is_err());
        assert!(parse_includes(&json!({ "books": "publisher" })).is_err());
    }

    #[test]
    fn non_symbol_leaves_are_rejected() {
        for spec in [
            json!([1]),
            json!([true]),
            json!([null]),
            json!([""]),
            json!(["two words"]),
            json!([{ "books": 3 }]),
            json!([{ "books": ["publisher", null] }]),
            json!([{ "": "publisher" }]),
        ] {
            let err = parse_includes(&spec).unwrap_err();
            assert!(err.is_config(), "{spec} should be a config error");
        }
    }

    #[test]
    fn error_names_the_offending_position() {
        let err = parse_includes(&json!(["address", { "books": ["publisher", 7] }])).unwrap_err();
        assert!(matches!(
            err,
            ProjectorError::InvalidIncludes { path, .. } if path == "includes[1].books[1]"
        ));
    }
}

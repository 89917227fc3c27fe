//! Collapses aggregated sub-documents coming back from the store into
//! [`GlossaryDocument`]s.
//!
//! Depending on how the engine hands back JSON aggregates, the value is
//! either already structured, a serialized string, or missing altogether.
//! All three are funnelled through [`normalize`], which never fails: input
//! that cannot be parsed yields no documents.

use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::model::{CourseEntry, GlossaryDocument};

#[derive(Debug, Clone, PartialEq)]
pub enum RawAggregate {
    Structured(Value),
    Text(String),
    Absent,
}

impl From<rusqlite::types::Value> for RawAggregate {
    fn from(value: rusqlite::types::Value) -> Self {
        use rusqlite::types::Value as Sql;
        match value {
            Sql::Null => RawAggregate::Absent,
            Sql::Text(text) => RawAggregate::Text(text),
            Sql::Blob(bytes) => RawAggregate::Text(String::from_utf8_lossy(&bytes).into_owned()),
            Sql::Integer(n) => RawAggregate::Structured(Value::from(n)),
            Sql::Real(f) => RawAggregate::Structured(
                Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            ),
        }
    }
}

impl RawAggregate {
    /// The aggregate as a list of records. Arrays are spread, a lone object
    /// counts as one record, anything else is empty.
    pub fn into_records(self) -> Vec<Value> {
        match self {
            RawAggregate::Absent => Vec::new(),
            RawAggregate::Structured(value) => spread(value),
            RawAggregate::Text(text) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => spread(value),
                Err(err) => {
                    warn!(error = %err, len = text.len(), "discarding malformed aggregate");
                    Vec::new()
                }
            },
        }
    }
}

fn spread(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    }
}

pub fn normalize(raw: RawAggregate) -> Vec<GlossaryDocument> {
    raw.into_records().iter().map(map_glossary_row).collect()
}

/// Maps one aggregated record onto the canonical document shape.
pub fn map_glossary_row(record: &Value) -> GlossaryDocument {
    let empty = Map::new();
    let fields = record.as_object().unwrap_or(&empty);
    GlossaryDocument {
        term: text_field(fields, "term"),
        definition: text_field(fields, "definition"),
        domain: text_field(fields, "domain"),
        kind: text_field(fields, "kind"),
        courses: match fields.get("courses") {
            Some(Value::Array(courses)) => courses.iter().map(map_course).collect(),
            _ => Vec::new(),
        },
        weblinks: match fields.get("weblinks") {
            Some(Value::Array(links)) => links.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![other.clone()],
        },
    }
}

fn map_course(course: &Value) -> CourseEntry {
    let empty = Map::new();
    let fields = course.as_object().unwrap_or(&empty);
    CourseEntry {
        title: text_field(fields, "title"),
        short_form: text_field(fields, "short_form"),
        hve_credits: fields.get("hve_credits").and_then(credits),
        weblink: text_field(fields, "weblink"),
    }
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn credits(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => s.trim().parse::<Number>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_aggregate_is_parsed() {
        let raw = RawAggregate::Text(
            r#"[{"term":"Handlebars","definition":"Templates","domain":"Node","kind":"Template-motor","courses":[],"weblinks":["/a"]}]"#
                .to_string(),
        );
        let docs = normalize(raw);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].term.as_deref(), Some("Handlebars"));
        assert_eq!(docs[0].kind.as_deref(), Some("Template-motor"));
        assert_eq!(docs[0].weblinks, [json!("/a")]);
    }

    #[test]
    fn malformed_text_yields_nothing() {
        assert!(normalize(RawAggregate::Text("[{\"term\":".to_string())).is_empty());
        assert!(normalize(RawAggregate::Text("42".to_string())).is_empty());
        assert!(normalize(RawAggregate::Absent).is_empty());
    }

    #[test]
    fn single_object_counts_as_one_record() {
        let docs = normalize(RawAggregate::Structured(json!({"term": "Redux"})));
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].term.as_deref(), Some("Redux"));
    }

    #[test]
    fn missing_fields_default_to_null_or_empty() {
        let doc = map_glossary_row(&json!({"term": "JSX"}));
        assert_eq!(doc.term.as_deref(), Some("JSX"));
        assert_eq!(doc.definition, None);
        assert_eq!(doc.domain, None);
        assert_eq!(doc.kind, None);
        assert!(doc.courses.is_empty());
        assert!(doc.weblinks.is_empty());
    }

    #[test]
    fn non_object_record_maps_to_empty_document() {
        assert_eq!(map_glossary_row(&json!("oops")), GlossaryDocument::default());
    }

    #[test]
    fn courses_get_null_defaults() {
        let doc = map_glossary_row(&json!({
            "courses": [
                {"title": "Frontend", "hve_credits": 7.5},
                {"short_form": "BE", "hve_credits": "30", "weblink": "/be"},
                "not an object"
            ]
        }));
        assert_eq!(doc.courses.len(), 3);
        assert_eq!(doc.courses[0].title.as_deref(), Some("Frontend"));
        assert_eq!(doc.courses[0].short_form, None);
        assert_eq!(doc.courses[0].hve_credits.as_ref().and_then(Number::as_f64), Some(7.5));
        assert_eq!(doc.courses[0].weblink, None);
        assert_eq!(doc.courses[1].hve_credits.as_ref().and_then(Number::as_u64), Some(30));
        assert_eq!(doc.courses[1].weblink.as_deref(), Some("/be"));
        assert_eq!(doc.courses[2], CourseEntry::default());
    }

    #[test]
    fn courses_that_are_not_a_list_are_dropped() {
        let doc = map_glossary_row(&json!({"courses": {"title": "x"}}));
        assert!(doc.courses.is_empty());
    }

    #[test]
    fn scalar_weblink_is_wrapped() {
        let doc = map_glossary_row(&json!({"weblinks": "https://handlebarsjs.com"}));
        assert_eq!(doc.weblinks, [json!("https://handlebarsjs.com")]);
        let doc = map_glossary_row(&json!({"weblinks": null}));
        assert!(doc.weblinks.is_empty());
    }

    #[test]
    fn weblink_list_is_copied_as_is() {
        let doc = map_glossary_row(&json!({"weblinks": ["/a", null, 7, {"path": "/b"}]}));
        assert_eq!(
            doc.weblinks,
            [json!("/a"), Value::Null, json!(7), json!({"path": "/b"})]
        );
    }

    #[test]
    fn sql_values_map_to_variants() {
        use rusqlite::types::Value as Sql;
        assert_eq!(RawAggregate::from(Sql::Null), RawAggregate::Absent);
        assert_eq!(
            RawAggregate::from(Sql::Text("[]".to_string())),
            RawAggregate::Text("[]".to_string())
        );
        assert_eq!(
            RawAggregate::from(Sql::Integer(3)),
            RawAggregate::Structured(json!(3))
        );
    }
}

//! Firestore REST implementation for the events collection.
//!
//! All calls authenticate with the account's id token, so Firestore
//! security rules apply exactly as they would for any other client.
//! Values cross the wire in Firestore's typed-value envelope and are
//! flattened to plain JSON before they reach planapp.

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};

use planapp_core::event::Document;

use crate::auth::extract_error;
use crate::config;
use crate::session::Session;

const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";
const EVENTS_COLLECTION: &str = "events";

fn documents_url(project_id: &str) -> String {
    format!(
        "{}/projects/{}/databases/(default)/documents",
        FIRESTORE_BASE, project_id
    )
}

/// Run the owner-scoped query and return the matching documents.
pub async fn query_events(uid: &str) -> Result<Vec<Document>> {
    let config = config::load()?;
    let session = Session::load_valid(uid).await?;

    let response = reqwest::Client::new()
        .post(format!("{}:runQuery", documents_url(&config.project_id)))
        .bearer_auth(session.id_token())
        .json(&json!({
            "structuredQuery": {
                "from": [{ "collectionId": EVENTS_COLLECTION }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "owner_id" },
                        "op": "EQUAL",
                        "value": { "stringValue": uid },
                    }
                },
            }
        }))
        .send()
        .await
        .context("Failed to reach Firestore")?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Query failed: {}", extract_error(&error_text));
    }

    let results: Vec<Value> = response
        .json()
        .await
        .context("Failed to parse Firestore query response")?;

    // An empty result set still yields one entry (readTime only, no document).
    let mut documents = Vec::new();
    for entry in results {
        if let Some(document) = entry.get("document") {
            documents.push(decode_document(document)?);
        }
    }

    Ok(documents)
}

/// Create a document and return its Firestore-assigned id.
pub async fn add_event(uid: &str, fields: &Map<String, Value>) -> Result<String> {
    let config = config::load()?;
    let session = Session::load_valid(uid).await?;

    let response = reqwest::Client::new()
        .post(format!(
            "{}/{}",
            documents_url(&config.project_id),
            EVENTS_COLLECTION
        ))
        .bearer_auth(session.id_token())
        .json(&json!({ "fields": to_firestore_fields(fields) }))
        .send()
        .await
        .context("Failed to reach Firestore")?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Create failed: {}", extract_error(&error_text));
    }

    let created: Value = response
        .json()
        .await
        .context("Failed to parse Firestore create response")?;

    let name = created
        .get("name")
        .and_then(Value::as_str)
        .context("Firestore create response has no document name")?;

    Ok(id_from_name(name).to_string())
}

/// Replace the document's mutable fields. Fails if the document no longer
/// exists, so a stale editor cannot resurrect a deleted event.
pub async fn update_event(uid: &str, id: &str, fields: &Map<String, Value>) -> Result<()> {
    let config = config::load()?;
    let session = Session::load_valid(uid).await?;

    let mut url = format!(
        "{}/{}/{}?currentDocument.exists=true",
        documents_url(&config.project_id),
        EVENTS_COLLECTION,
        id
    );
    for field in fields.keys() {
        url.push_str("&updateMask.fieldPaths=");
        url.push_str(field);
    }

    let response = reqwest::Client::new()
        .patch(url)
        .bearer_auth(session.id_token())
        .json(&json!({ "fields": to_firestore_fields(fields) }))
        .send()
        .await
        .context("Failed to reach Firestore")?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Update failed: {}", extract_error(&error_text));
    }

    Ok(())
}

/// Delete a document. Deleting an id that is already gone succeeds.
pub async fn delete_event(uid: &str, id: &str) -> Result<()> {
    let config = config::load()?;
    let session = Session::load_valid(uid).await?;

    let response = reqwest::Client::new()
        .delete(format!(
            "{}/{}/{}",
            documents_url(&config.project_id),
            EVENTS_COLLECTION,
            id
        ))
        .bearer_auth(session.id_token())
        .send()
        .await
        .context("Failed to reach Firestore")?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Delete failed: {}", extract_error(&error_text));
    }

    Ok(())
}

// ============================================================================
// Wire format conversion
// ============================================================================

fn decode_document(document: &Value) -> Result<Document> {
    let name = document
        .get("name")
        .and_then(Value::as_str)
        .context("Firestore document has no name")?;

    let mut fields = Map::new();
    if let Some(Value::Object(wire_fields)) = document.get("fields") {
        for (key, value) in wire_fields {
            fields.insert(key.clone(), from_firestore_value(value));
        }
    }

    Ok(Document {
        id: id_from_name(name).to_string(),
        fields,
    })
}

fn id_from_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn to_firestore_fields(fields: &Map<String, Value>) -> Value {
    let wire: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| (key.clone(), to_firestore_value(value)))
        .collect();

    Value::Object(wire)
}

fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            // Firestore transports integers as strings.
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": {
                "values": items.iter().map(to_firestore_value).collect::<Vec<_>>(),
            }
        }),
        Value::Object(map) => json!({
            "mapValue": {
                "fields": map
                    .iter()
                    .map(|(k, v)| (k.clone(), to_firestore_value(v)))
                    .collect::<Map<_, _>>(),
            }
        }),
    }
}

fn from_firestore_value(value: &Value) -> Value {
    let Some(wrapper) = value.as_object() else {
        return Value::Null;
    };

    if let Some(s) = wrapper.get("stringValue").and_then(Value::as_str) {
        return Value::String(s.to_string());
    }
    // Timestamps flatten to their RFC 3339 text form.
    if let Some(s) = wrapper.get("timestampValue").and_then(Value::as_str) {
        return Value::String(s.to_string());
    }
    if let Some(b) = wrapper.get("booleanValue").and_then(Value::as_bool) {
        return Value::Bool(b);
    }
    if let Some(i) = wrapper.get("integerValue") {
        // Arrives as a string, occasionally as a bare number.
        let parsed = match i {
            Value::String(s) => s.parse::<i64>().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        };
        if let Some(parsed) = parsed {
            return Value::from(parsed);
        }
    }
    if let Some(d) = wrapper.get("doubleValue").and_then(Value::as_f64) {
        return Value::from(d);
    }
    if wrapper.contains_key("nullValue") {
        return Value::Null;
    }
    if let Some(items) = wrapper
        .get("arrayValue")
        .and_then(|a| a.get("values"))
        .and_then(Value::as_array)
    {
        return Value::Array(items.iter().map(from_firestore_value).collect());
    }
    if let Some(Value::Object(map)) = wrapper.get("mapValue").and_then(|m| m.get("fields")).cloned()
    {
        return Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_firestore_value(v)))
                .collect(),
        );
    }

    Value::Null
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_and_integers_round_trip() {
        assert_eq!(
            to_firestore_value(&json!("Dentist")),
            json!({ "stringValue": "Dentist" })
        );
        assert_eq!(
            to_firestore_value(&json!(42)),
            json!({ "integerValue": "42" })
        );
        assert_eq!(
            from_firestore_value(&json!({ "integerValue": "42" })),
            json!(42)
        );
    }

    #[test]
    fn timestamps_flatten_to_strings() {
        assert_eq!(
            from_firestore_value(&json!({ "timestampValue": "2025-03-20T15:00:00Z" })),
            json!("2025-03-20T15:00:00Z")
        );
    }

    #[test]
    fn unknown_wrappers_become_null() {
        assert_eq!(
            from_firestore_value(&json!({ "geoPointValue": { "latitude": 0.0 } })),
            Value::Null
        );
    }

    #[test]
    fn document_ids_come_from_the_resource_name() {
        assert_eq!(
            id_from_name("projects/p/databases/(default)/documents/events/abc123"),
            "abc123"
        );
    }

    #[test]
    fn decode_document_flattens_fields() {
        let wire = json!({
            "name": "projects/p/databases/(default)/documents/events/doc-1",
            "fields": {
                "title": { "stringValue": "Dentist" },
                "state": { "stringValue": "urgent" },
            },
        });

        let document = decode_document(&wire).unwrap();
        assert_eq!(document.id, "doc-1");
        assert_eq!(document.fields["title"], json!("Dentist"));
        assert_eq!(document.fields["state"], json!("urgent"));
    }
}

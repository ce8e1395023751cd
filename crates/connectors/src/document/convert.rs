use crate::error::DbError;
use mongodb::bson::{Bson, Document};
use serde_json::Value;

/// Renders a document as relaxed extended JSON, so ObjectIds and dates survive the
/// intermediate files as `{"$oid": ..}` / `{"$date": ..}` wrappers.
pub fn document_to_json(document: Document) -> Value {
    Bson::Document(document).into_relaxed_extjson()
}

/// Parses an extended-JSON record back into a document.
pub fn json_to_document(value: Value) -> Result<Document, DbError> {
    match Bson::try_from(value).map_err(|err| DbError::Document(err.to_string()))? {
        Bson::Document(document) => Ok(document),
        other => Err(DbError::Document(format!(
            "expected an object record, found {:?}",
            other.element_type()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};
    use serde_json::json;

    #[test]
    fn object_ids_round_trip_through_json() {
        let id = ObjectId::new();
        let value = document_to_json(doc! { "_id": id, "email": "a@b.c" });
        assert_eq!(value["_id"]["$oid"], json!(id.to_hex()));

        let back = json_to_document(value).unwrap();
        assert_eq!(back.get_object_id("_id").unwrap(), id);
        assert_eq!(back.get_str("email").unwrap(), "a@b.c");
    }

    #[test]
    fn dates_are_restored() {
        let back = json_to_document(json!({"at": {"$date": "2024-01-01T00:00:00Z"}})).unwrap();
        assert!(back.get_datetime("at").is_ok());
    }

    #[test]
    fn rejects_non_object_records() {
        assert!(matches!(json_to_document(json!([1, 2])), Err(DbError::Document(_))));
    }
}

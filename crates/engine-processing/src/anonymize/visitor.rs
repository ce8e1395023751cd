use crate::anonymize::{
    classifier::{Classification, FieldClassifier, FieldKind},
    generator::ValueGenerator,
};
use rand::Rng;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Walks records and replaces sensitive values in place.
///
/// A kind picked up from a field name applies to everything nested below it,
/// until a nested key classifies on its own. Preserved keys are never descended into.
pub struct Anonymizer<R> {
    classifier: Arc<FieldClassifier>,
    generator: ValueGenerator<R>,
}

impl<R: Rng> Anonymizer<R> {
    pub fn new(classifier: Arc<FieldClassifier>, rng: R) -> Self {
        Self {
            classifier,
            generator: ValueGenerator::new(rng),
        }
    }

    pub fn classifier(&self) -> &FieldClassifier {
        &self.classifier
    }

    pub fn anonymize_record(&mut self, record: Value) -> Value {
        self.visit(record, None)
    }

    pub fn anonymize_value(&mut self, value: Value, kind: Option<FieldKind>) -> Value {
        self.visit(value, kind)
    }

    /// Anonymizes one CSV cell whose column classified as `classification`.
    /// Cells holding JSON objects or arrays are walked like document fields.
    pub fn anonymize_cell(&mut self, cell: &str, classification: Classification) -> String {
        let kind = match classification {
            _ if cell.is_empty() => return String::new(),
            Classification::Preserve => return cell.to_string(),
            Classification::Anonymize(kind) => Some(kind),
            Classification::Passthrough => None,
        };

        if cell.starts_with(['{', '['])
            && let Ok(nested) = serde_json::from_str::<Value>(cell)
        {
            return self.visit(nested, kind).to_string();
        }

        match kind {
            Some(kind) => match self.generator.generate(kind, &Value::String(cell.to_string())) {
                Value::String(s) => s,
                other => other.to_string(),
            },
            None => cell.to_string(),
        }
    }

    fn visit(&mut self, value: Value, inherited: Option<FieldKind>) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.visit_object(map, inherited)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.visit(item, inherited))
                    .collect(),
            ),
            scalar => match inherited {
                Some(kind) => self.generator.generate(kind, &scalar),
                None => scalar,
            },
        }
    }

    fn visit_object(&mut self, map: Map<String, Value>, inherited: Option<FieldKind>) -> Map<String, Value> {
        map.into_iter()
            .map(|(key, value)| {
                let value = if let Some(operator) = key.strip_prefix('$') {
                    self.visit_extended(operator, value, inherited)
                } else {
                    match self.classifier.classify(&key) {
                        Classification::Preserve => value,
                        Classification::Anonymize(kind) => self.visit(value, Some(kind)),
                        Classification::Passthrough => self.visit(value, inherited),
                    }
                };
                (key, value)
            })
            .collect()
    }

    // Extended-JSON wrappers ({"$oid": ..}, {"$date": ..}, {"$numberLong": ..})
    // keep their wrapper shape; only the wrapped value is replaced.
    fn visit_extended(&mut self, operator: &str, value: Value, inherited: Option<FieldKind>) -> Value {
        let Some(kind) = inherited else {
            return value;
        };

        match (operator, value) {
            ("oid", Value::String(_)) => Value::String(self.generator.object_id()),
            ("date", Value::String(_)) => Value::String(self.generator.date()),
            ("date", nested) => self.visit(nested, Some(kind)),
            (op, Value::String(digits)) if op.starts_with("number") => {
                Value::String(self.generator.scramble(&digits))
            }
            (_, other) => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use serde_json::json;

    fn anonymizer(extra: &[&str]) -> Anonymizer<StdRng> {
        let extra: Vec<String> = extra.iter().map(|s| s.to_string()).collect();
        Anonymizer::new(
            Arc::new(FieldClassifier::new(&extra)),
            StdRng::seed_from_u64(42),
        )
    }

    #[test]
    fn replaces_sensitive_fields_and_keeps_the_rest() {
        let mut a = anonymizer(&[]);
        let out = a.anonymize_record(json!({
            "_id": {"$oid": "65f0c0ffee0000000000abcd"},
            "email": "jane@corp.io",
            "status": "active",
            "amount": 120,
            "createdAt": {"$date": "2024-02-01T10:00:00.000Z"}
        }));

        assert_eq!(out["_id"], json!({"$oid": "65f0c0ffee0000000000abcd"}));
        assert_ne!(out["email"], json!("jane@corp.io"));
        assert!(out["email"].as_str().unwrap().contains('@'));
        assert_eq!(out["status"], json!("active"));
        assert_eq!(out["amount"], json!(120));
        assert_eq!(out["createdAt"], json!({"$date": "2024-02-01T10:00:00.000Z"}));
    }

    #[test]
    fn kind_flows_into_nested_values() {
        let mut a = anonymizer(&[]);
        let out = a.anonymize_record(json!({
            "address": {"line1": "12 Real Road", "geo": [1, 2]},
            "contacts": [{"kind": "home", "phone": "555-0100"}]
        }));

        assert_ne!(out["address"]["line1"], json!("12 Real Road"));
        assert!(out["address"]["geo"].as_array().unwrap().iter().all(Value::is_number));
        assert_eq!(out["contacts"][0]["kind"].as_str().unwrap().len(), 4);
        let phone = out["contacts"][0]["phone"].as_str().unwrap();
        assert_eq!(phone.len(), 8);
        assert_eq!(&phone[3..4], "-");
    }

    #[test]
    fn preserved_subtrees_are_untouched() {
        let mut a = anonymizer(&["billingProfile"]);
        let record = json!({"billingProfile": {"email": "keep@corp.io", "iban": "DE00 1234"}});
        assert_eq!(a.anonymize_record(record.clone()), record);
    }

    #[test]
    fn extended_wrappers_keep_their_shape() {
        let mut a = anonymizer(&[]);
        let out = a.anonymize_record(json!({
            "dob": {"$date": "1990-04-12T00:00:00.000Z"},
            "accountNumber": {"$numberLong": "1234567890"},
            "status": {"$oid": "65f0c0ffee0000000000abcd"}
        }));

        assert!(out["dob"]["$date"].as_str().unwrap().ends_with('Z'));
        assert_eq!(out["accountNumber"]["$numberLong"].as_str().unwrap().len(), 10);
        assert_eq!(out["status"]["$oid"], json!("65f0c0ffee0000000000abcd"));
    }

    #[test]
    fn cells_follow_column_classification() {
        let mut a = anonymizer(&[]);
        let classifier = FieldClassifier::default();

        assert_eq!(a.anonymize_cell("", classifier.classify("email")), "");
        assert_eq!(a.anonymize_cell("42", classifier.classify("id")), "42");
        assert_eq!(a.anonymize_cell("paid", classifier.classify("status")), "paid");
        assert_ne!(a.anonymize_cell("Jane Doe", classifier.classify("full_name")), "Jane Doe");

        let cell = a.anonymize_cell(r#"{"email":"x@corp.io","plan":"pro"}"#, classifier.classify("meta"));
        let nested: Value = serde_json::from_str(&cell).unwrap();
        assert_eq!(nested["plan"], json!("pro"));
        assert_ne!(nested["email"], json!("x@corp.io"));
    }

    #[test]
    fn passthrough_numbers_keep_their_digits() {
        let mut a = anonymizer(&[]);
        let classifier = FieldClassifier::default();

        let cell = r#"{"limit":123456789012345678901234.56,"rate":0.10}"#;
        assert_eq!(a.anonymize_cell(cell, classifier.classify("terms")), cell);

        let record: Value = serde_json::from_str(r#"{"balance":98765432109876543210.99}"#).unwrap();
        let out = a.anonymize_record(record);
        assert_eq!(out["balance"].to_string(), "98765432109876543210.99");
    }
}

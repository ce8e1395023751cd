use crate::anonymize::classifier::FieldKind;
use chrono::{Duration, NaiveDate};
use rand::{Rng, distributions::Alphanumeric, seq::SliceRandom};
use serde_json::{Number, Value};

pub const REDACTED: &str = "REDACTED";

const FIRST_NAMES: &[&str] = &[
    "Aarav", "Alex", "Amara", "Ben", "Chloe", "Daniel", "Elena", "Farah", "George", "Hana",
    "Isaac", "Jia", "Kofi", "Lena", "Marco", "Nina", "Omar", "Priya", "Quinn", "Rosa", "Sam",
    "Tara", "Uma", "Victor", "Wei", "Yusuf", "Zoe",
];

const LAST_NAMES: &[&str] = &[
    "Adams", "Baker", "Chen", "Diaz", "Evans", "Fischer", "Garcia", "Hughes", "Iyer", "Jensen",
    "Kim", "Lopez", "Mehta", "Novak", "Okafor", "Patel", "Rossi", "Silva", "Tanaka", "Walker",
];

const STREETS: &[&str] = &[
    "Maple", "Oak", "Cedar", "Elm", "Lake", "Hill", "Park", "River", "Sunset", "Willow",
];

const STREET_SUFFIXES: &[&str] = &["Street", "Avenue", "Road", "Lane", "Drive", "Court"];

const CITIES: &[&str] = &[
    "Springfield", "Riverton", "Fairview", "Lakeside", "Greenville", "Oakridge", "Milton",
    "Ashford", "Brookfield", "Clayton",
];

const STATES: &[&str] = &[
    "Avalon", "Bellmont", "Crestia", "Dunmore", "Eastmarch", "Fernwood", "Glenhaven", "Highland",
];

const BANKS: &[&str] = &[
    "First Example Bank", "Sample Savings", "Placeholder Trust", "Demo Credit Union",
    "Test National Bank",
];

const EMAIL_DOMAINS: &[&str] = &["example.com", "example.org", "example.net"];

const UPI_HANDLES: &[&str] = &["okexample", "testpay", "demobank"];

const HEX: &[u8] = b"0123456789abcdef";

/// Produces synthetic, non-identifying values shaped like the originals.
///
/// Output is not stable across runs; seed the injected rng to make it reproducible.
pub struct ValueGenerator<R> {
    rng: R,
}

impl<R: Rng> ValueGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Replacement for a scalar `original` of the given kind. Null, booleans and
    /// empty strings come back unchanged; numbers stay numbers.
    pub fn generate(&mut self, kind: FieldKind, original: &Value) -> Value {
        match original {
            Value::Null | Value::Bool(_) => original.clone(),
            Value::String(s) if s.is_empty() => original.clone(),
            Value::Number(n) => self.number_like(n),
            Value::String(s) => Value::String(self.text(kind, s)),
            Value::Array(_) | Value::Object(_) => Value::String(REDACTED.to_string()),
        }
    }

    fn text(&mut self, kind: FieldKind, original: &str) -> String {
        match kind {
            FieldKind::FullName => format!("{} {}", self.pick(FIRST_NAMES), self.pick(LAST_NAMES)),
            FieldKind::FirstName => self.pick(FIRST_NAMES).to_string(),
            FieldKind::LastName => self.pick(LAST_NAMES).to_string(),
            FieldKind::Email => format!(
                "{}.{}{}@{}",
                self.pick(FIRST_NAMES).to_lowercase(),
                self.pick(LAST_NAMES).to_lowercase(),
                self.rng.gen_range(1..100),
                self.pick(EMAIL_DOMAINS)
            ),
            FieldKind::Phone
            | FieldKind::PostalCode
            | FieldKind::NationalId
            | FieldKind::BankAccount
            | FieldKind::RoutingCode
            | FieldKind::CreditCard => self.scramble(original),
            FieldKind::Address => format!(
                "{} {} {}",
                self.rng.gen_range(1..9999),
                self.pick(STREETS),
                self.pick(STREET_SUFFIXES)
            ),
            FieldKind::City => self.pick(CITIES).to_string(),
            FieldKind::State => self.pick(STATES).to_string(),
            FieldKind::BankName => self.pick(BANKS).to_string(),
            FieldKind::UpiId => format!(
                "{}{}@{}",
                self.pick(FIRST_NAMES).to_lowercase(),
                self.rng.gen_range(10..1000),
                self.pick(UPI_HANDLES)
            ),
            FieldKind::Identifier => self.alphanumeric(original.chars().count()),
            FieldKind::Redacted => {
                if is_numeric(original) {
                    self.scramble(original)
                } else if is_date_like(original) {
                    self.date_like(original)
                } else {
                    REDACTED.to_string()
                }
            }
        }
    }

    /// Random 24-digit hex string shaped like a MongoDB ObjectId.
    pub fn object_id(&mut self) -> String {
        (0..24)
            .map(|_| HEX[self.rng.gen_range(0..HEX.len())] as char)
            .collect()
    }

    /// Random timestamp (midnight UTC) rendered as RFC 3339 with milliseconds.
    pub fn date(&mut self) -> String {
        format!("{}T00:00:00.000Z", self.random_day().format("%Y-%m-%d"))
    }

    pub fn alphanumeric(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| self.rng.sample(Alphanumeric) as char)
            .collect()
    }

    /// Replaces digits with digits and letters with letters of the same case,
    /// keeping punctuation in place. A leading non-zero digit stays non-zero.
    pub fn scramble(&mut self, original: &str) -> String {
        let mut seen_digit = false;
        original
            .chars()
            .map(|c| match c {
                '0'..='9' => {
                    let first = !seen_digit;
                    seen_digit = true;
                    let low = if first && c != '0' { 1 } else { 0 };
                    char::from(b'0' + self.rng.gen_range(low..10u8))
                }
                'a'..='z' => char::from(b'a' + self.rng.gen_range(0..26u8)),
                'A'..='Z' => char::from(b'A' + self.rng.gen_range(0..26u8)),
                other => other,
            })
            .collect()
    }

    fn number_like(&mut self, original: &Number) -> Value {
        let text = original.to_string();
        if text.contains(['e', 'E']) {
            return Value::from(self.rng.gen_range(0..1000));
        }

        let scrambled = self.scramble(&text);
        if original.is_f64() {
            scrambled
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::from(0.0))
        } else if let Ok(n) = scrambled.parse::<i64>() {
            Value::from(n)
        } else {
            scrambled.parse::<u64>().map(Value::from).unwrap_or(Value::from(0))
        }
    }

    fn date_like(&mut self, original: &str) -> String {
        if original.len() == 10 {
            self.random_day().format("%Y-%m-%d").to_string()
        } else {
            self.date()
        }
    }

    fn random_day(&mut self) -> NaiveDate {
        let base = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap_or_default();
        base + Duration::days(self.rng.gen_range(0..20_000))
    }

    fn pick(&mut self, choices: &[&'static str]) -> &'static str {
        choices.choose(&mut self.rng).copied().unwrap_or(REDACTED)
    }
}

fn is_numeric(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut dots = 0;
    !digits.is_empty()
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| {
            if c == '.' {
                dots += 1;
                dots == 1
            } else {
                c.is_ascii_digit()
            }
        })
}

fn is_date_like(s: &str) -> bool {
    s.get(..10)
        .is_some_and(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").is_ok())
        && s[10..].chars().next().is_none_or(|c| c == 'T' || c == ' ')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use serde_json::json;

    fn generator() -> ValueGenerator<StdRng> {
        ValueGenerator::new(StdRng::seed_from_u64(7))
    }

    #[test]
    fn identifier_keeps_length() {
        let mut g = generator();
        let value = g.generate(FieldKind::Identifier, &json!("RCPT-000123"));
        let text = value.as_str().unwrap();
        assert_eq!(text.len(), "RCPT-000123".len());
        assert!(text.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(text, "RCPT-000123");
    }

    #[test]
    fn scramble_keeps_punctuation_positions() {
        let mut g = generator();
        let original = "+1 (555) 010-9999";
        let value = g.generate(FieldKind::Phone, &json!(original));
        let text = value.as_str().unwrap();
        assert_eq!(text.len(), original.len());
        for (a, b) in original.chars().zip(text.chars()) {
            assert_eq!(a.is_ascii_digit(), b.is_ascii_digit());
            if !a.is_ascii_alphanumeric() {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn numbers_stay_numbers_of_same_width() {
        let mut g = generator();
        let value = g.generate(FieldKind::BankAccount, &json!(123456789));
        assert!(value.is_i64());
        assert_eq!(value.to_string().len(), 9);

        let value = g.generate(FieldKind::Redacted, &json!(52000.5));
        assert!(value.is_f64());
    }

    #[test]
    fn emails_use_reserved_domains() {
        let mut g = generator();
        let value = g.generate(FieldKind::Email, &json!("jane@corp.io"));
        let text = value.as_str().unwrap();
        let (_, domain) = text.split_once('@').unwrap();
        assert!(EMAIL_DOMAINS.contains(&domain));
    }

    #[test]
    fn redacted_keeps_numeric_and_date_shapes() {
        let mut g = generator();
        assert_eq!(g.generate(FieldKind::Redacted, &json!("hunter2")), json!(REDACTED));

        let salary = g.generate(FieldKind::Redacted, &json!("85000"));
        assert!(is_numeric(salary.as_str().unwrap()));
        assert_eq!(salary.as_str().unwrap().len(), 5);

        let dob = g.generate(FieldKind::Redacted, &json!("1990-04-12"));
        assert!(NaiveDate::parse_from_str(dob.as_str().unwrap(), "%Y-%m-%d").is_ok());
    }

    #[test]
    fn absent_values_are_never_invented() {
        let mut g = generator();
        assert_eq!(g.generate(FieldKind::FullName, &Value::Null), Value::Null);
        assert_eq!(g.generate(FieldKind::FullName, &json!("")), json!(""));
        assert_eq!(g.generate(FieldKind::Redacted, &json!(true)), json!(true));
    }

    #[test]
    fn object_ids_are_hex() {
        let id = generator().object_id();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

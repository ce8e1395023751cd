/// What a sensitive field holds, selecting the generator used to replace it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    FullName,
    FirstName,
    LastName,
    Email,
    Phone,
    Address,
    City,
    State,
    PostalCode,
    NationalId,
    BankAccount,
    BankName,
    RoutingCode,
    UpiId,
    CreditCard,
    /// Receipt/transaction style references; replaced by random alphanumerics.
    Identifier,
    /// Sensitive but with no dedicated generator.
    Redacted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Kept verbatim, including anything nested below it.
    Preserve,
    Anonymize(FieldKind),
    Passthrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Match {
    Exact,
    Contains,
}

struct KindRule {
    kind: FieldKind,
    patterns: &'static [(Match, &'static str)],
}

use Match::{Contains, Exact};

// Evaluated top to bottom; the first rule with a matching pattern wins.
const KIND_RULES: &[KindRule] = &[
    KindRule {
        kind: FieldKind::Email,
        patterns: &[(Contains, "email")],
    },
    KindRule {
        kind: FieldKind::FirstName,
        patterns: &[(Contains, "firstname"), (Contains, "givenname")],
    },
    KindRule {
        kind: FieldKind::LastName,
        patterns: &[
            (Contains, "lastname"),
            (Contains, "surname"),
            (Contains, "familyname"),
        ],
    },
    KindRule {
        kind: FieldKind::BankName,
        patterns: &[(Contains, "bankname")],
    },
    KindRule {
        kind: FieldKind::FullName,
        patterns: &[
            (Contains, "fullname"),
            (Contains, "accountname"),
            (Contains, "accountholder"),
            (Contains, "name"),
        ],
    },
    KindRule {
        kind: FieldKind::Phone,
        patterns: &[
            (Contains, "phone"),
            (Contains, "mobile"),
            (Contains, "contactnumber"),
            (Contains, "contact"),
            (Contains, "whatsapp"),
        ],
    },
    KindRule {
        kind: FieldKind::Address,
        patterns: &[(Contains, "address"), (Contains, "street")],
    },
    KindRule {
        kind: FieldKind::City,
        patterns: &[(Contains, "city")],
    },
    KindRule {
        kind: FieldKind::State,
        patterns: &[(Contains, "state")],
    },
    KindRule {
        kind: FieldKind::PostalCode,
        patterns: &[
            (Contains, "zip"),
            (Contains, "postal"),
            (Contains, "pincode"),
        ],
    },
    KindRule {
        kind: FieldKind::NationalId,
        patterns: &[
            (Contains, "ssn"),
            (Contains, "social"),
            (Contains, "aadhaar"),
            (Contains, "aadhar"),
            (Contains, "nationalid"),
        ],
    },
    KindRule {
        kind: FieldKind::RoutingCode,
        patterns: &[
            (Contains, "ifsc"),
            (Contains, "routing"),
            (Contains, "swift"),
            (Contains, "sortcode"),
        ],
    },
    KindRule {
        kind: FieldKind::UpiId,
        patterns: &[
            (Exact, "upi"),
            (Contains, "upiid"),
            (Contains, "upihandle"),
            (Contains, "upiaddress"),
            (Contains, "vpa"),
        ],
    },
    KindRule {
        kind: FieldKind::BankAccount,
        patterns: &[
            (Contains, "accountnumber"),
            (Contains, "accountno"),
            (Contains, "bankaccount"),
            (Contains, "accountidentifier"),
            (Contains, "iban"),
            (Contains, "bank"),
        ],
    },
    KindRule {
        kind: FieldKind::CreditCard,
        patterns: &[
            (Contains, "creditcard"),
            (Contains, "cardnumber"),
            (Contains, "cardno"),
            (Contains, "cvv"),
        ],
    },
    KindRule {
        kind: FieldKind::Identifier,
        patterns: &[
            (Contains, "receipt"),
            (Contains, "transactionid"),
            (Contains, "txnid"),
            (Contains, "paymentid"),
            (Contains, "referencenumber"),
            (Contains, "referenceno"),
            (Contains, "invoicenumber"),
        ],
    },
];

// Sensitive names with no dedicated kind.
const REDACT_PATTERNS: &[(Match, &str)] = &[
    (Contains, "password"),
    (Contains, "passwd"),
    (Contains, "secret"),
    (Contains, "token"),
    (Exact, "dob"),
    (Contains, "birth"),
    (Contains, "salary"),
    (Contains, "passport"),
    (Contains, "license"),
    (Contains, "licence"),
    (Exact, "tax"),
    (Contains, "taxid"),
    (Contains, "taxnumber"),
    (Exact, "pan"),
    (Contains, "pannumber"),
    (Contains, "pancard"),
];

const DEFAULT_PRESERVE: &[(Match, &str)] = &[
    (Exact, "_id"),
    (Exact, "id"),
    (Exact, "__v"),
    (Contains, "createdat"),
    (Contains, "updatedat"),
    (Contains, "deletedat"),
];

/// Lowercases and strips `_`, `-` and whitespace so `first_name`, `First Name`
/// and `firstName` compare equal.
pub fn normalize(field: &str) -> String {
    field
        .chars()
        .filter(|c| !matches!(c, '_' | '-') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn matches(rule: Match, key: &str, pattern: &str) -> bool {
    match rule {
        Exact => key == pattern,
        Contains => key.contains(pattern),
    }
}

/// Maps field names to a [`Classification`]. The preserve-list is checked first.
#[derive(Debug, Clone)]
pub struct FieldClassifier {
    preserve: Vec<(Match, String)>,
}

impl Default for FieldClassifier {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl FieldClassifier {
    /// `extra_preserve` entries are matched exactly (after normalization).
    pub fn new(extra_preserve: &[String]) -> Self {
        let preserve = DEFAULT_PRESERVE
            .iter()
            .map(|(rule, pattern)| (*rule, normalize(pattern)))
            .chain(extra_preserve.iter().map(|field| (Exact, normalize(field))))
            .filter(|(_, pattern)| !pattern.is_empty())
            .collect();

        Self { preserve }
    }

    pub fn classify(&self, field: &str) -> Classification {
        let key = normalize(field);

        if self
            .preserve
            .iter()
            .any(|(rule, pattern)| matches(*rule, &key, pattern))
        {
            return Classification::Preserve;
        }

        for rule in KIND_RULES {
            if rule
                .patterns
                .iter()
                .any(|(m, pattern)| matches(*m, &key, pattern))
            {
                return Classification::Anonymize(rule.kind);
            }
        }

        if REDACT_PATTERNS
            .iter()
            .any(|(m, pattern)| matches(*m, &key, pattern))
        {
            return Classification::Anonymize(FieldKind::Redacted);
        }

        Classification::Passthrough
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(field: &str) -> Classification {
        FieldClassifier::default().classify(field)
    }

    #[test]
    fn email_fixtures_map_to_email() {
        for field in ["email", "Email", "user_email", "emailAddress", "WORK-EMAIL"] {
            assert_eq!(kind(field), Classification::Anonymize(FieldKind::Email), "{field}");
        }
    }

    #[test]
    fn identity_numbers_map_to_national_id() {
        for field in ["ssn", "SSN", "social_security_number", "socialId", "aadhaarNumber"] {
            assert_eq!(kind(field), Classification::Anonymize(FieldKind::NationalId), "{field}");
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        assert_eq!(kind("first_name"), Classification::Anonymize(FieldKind::FirstName));
        assert_eq!(kind("lastName"), Classification::Anonymize(FieldKind::LastName));
        assert_eq!(kind("bankName"), Classification::Anonymize(FieldKind::BankName));
        assert_eq!(kind("accountName"), Classification::Anonymize(FieldKind::FullName));
        assert_eq!(kind("bank_account_number"), Classification::Anonymize(FieldKind::BankAccount));
        assert_eq!(kind("ifscCode"), Classification::Anonymize(FieldKind::RoutingCode));
        assert_eq!(kind("receiptNo"), Classification::Anonymize(FieldKind::Identifier));
        assert_eq!(kind("mailingAddress"), Classification::Anonymize(FieldKind::Address));
    }

    #[test]
    fn preserve_list_beats_sensitive_patterns() {
        let classifier = FieldClassifier::new(&["customer_name".to_string()]);
        assert_eq!(classifier.classify("customerName"), Classification::Preserve);
        assert_eq!(classifier.classify("id"), Classification::Preserve);
        assert_eq!(classifier.classify("_id"), Classification::Preserve);
        assert_eq!(classifier.classify("createdAt"), Classification::Preserve);
        assert_eq!(
            classifier.classify("name"),
            Classification::Anonymize(FieldKind::FullName)
        );
    }

    #[test]
    fn sensitive_without_kind_is_redacted() {
        for field in ["password", "api_token", "dob", "dateOfBirth", "salary", "pan"] {
            assert_eq!(kind(field), Classification::Anonymize(FieldKind::Redacted), "{field}");
        }
    }

    #[test]
    fn unmatched_fields_pass_through() {
        for field in ["status", "quantity", "company", "groupId", "syntax", "", "ünïcode"] {
            assert_eq!(kind(field), Classification::Passthrough, "{field}");
        }
    }
}

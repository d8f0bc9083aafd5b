#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String },
    Degrade { reason_code: &'static str, text: String },
}

/// Limits applied to a free-text self-description before it reaches the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub max_description_chars: usize,
    pub min_description_words: usize,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { max_description_chars: 2000, min_description_words: 1 }
    }
}

impl GuardrailPolicy {
    pub fn evaluate(&self, description: &str) -> GuardrailDecision {
        let trimmed = description.trim();
        let words = trimmed.split_whitespace().count();

        if trimmed.is_empty() || words < self.min_description_words {
            return GuardrailDecision::Deny {
                reason_code: "description_empty",
                user_message: "I didn't catch a description. Tell me about your role and what you follow."
                    .to_string(),
            };
        }

        if trimmed.chars().count() > self.max_description_chars {
            let text: String = trimmed.chars().take(self.max_description_chars).collect();
            return GuardrailDecision::Degrade { reason_code: "description_truncated", text };
        }

        GuardrailDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::{GuardrailDecision, GuardrailPolicy};

    #[test]
    fn ordinary_description_is_allowed() {
        let decision = GuardrailPolicy::default().evaluate("crypto trader, DeFi and trading");
        assert_eq!(decision, GuardrailDecision::Allow);
    }

    #[test]
    fn blank_description_is_denied() {
        let decision = GuardrailPolicy::default().evaluate("   \n\t ");

        let reason_code = match decision {
            GuardrailDecision::Deny { reason_code, .. } => reason_code,
            _ => "",
        };
        assert_eq!(reason_code, "description_empty");
    }

    #[test]
    fn oversized_description_is_truncated_on_char_boundary() {
        let policy = GuardrailPolicy { max_description_chars: 5, min_description_words: 1 };
        let decision = policy.evaluate("héllo wörld");

        let (reason_code, text) = match decision {
            GuardrailDecision::Degrade { reason_code, text } => (reason_code, text),
            _ => ("", String::new()),
        };
        assert_eq!(reason_code, "description_truncated");
        assert_eq!(text, "héllo");
    }

    #[test]
    fn word_minimum_is_enforced() {
        let policy = GuardrailPolicy { max_description_chars: 2000, min_description_words: 3 };
        assert!(matches!(policy.evaluate("designer"), GuardrailDecision::Deny { .. }));
        assert_eq!(policy.evaluate("senior product designer"), GuardrailDecision::Allow);
    }
}

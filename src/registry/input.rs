//! Normalized facts handed over by the parser.

use dossier_types::FactKind;
use serde::{Deserialize, Serialize};

use super::RegistryValue;

/// One extracted fact with its source tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFact {
    pub key: String,
    pub value: RegistryValue,
    pub kind: FactKind,
    pub source: String,
}

/// The parser's output for one property. Order is preserved so that a
/// conflict is reported against the first value seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFacts {
    pub facts: Vec<NormalizedFact>,
}

impl NormalizedFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<RegistryValue>,
        kind: FactKind,
        source: impl Into<String>,
    ) -> Self {
        self.push(key, value, kind, source);
        self
    }

    pub fn push(
        &mut self,
        key: impl Into<String>,
        value: impl Into<RegistryValue>,
        kind: FactKind,
        source: impl Into<String>,
    ) {
        self.facts.push(NormalizedFact {
            key: key.into(),
            value: value.into(),
            kind,
            source: source.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_parser_payload() {
        let json = r#"{
            "facts": [
                {"key": "asking_price", "value": {"type": "decimal", "value": "485000.00"}, "kind": "FACT", "source": "funda"},
                {"key": "energy_label", "value": {"type": "text", "value": "C"}, "kind": "UNCERTAIN", "source": "funda"}
            ]
        }"#;
        let facts: NormalizedFacts = serde_json::from_str(json).unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts.facts[1].kind, FactKind::Uncertain);
        assert_eq!(facts.facts[1].value, RegistryValue::from("C"));
    }
}

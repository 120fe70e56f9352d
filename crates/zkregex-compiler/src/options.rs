//! Compilation options

use serde::{Deserialize, Serialize};
use zkregex_runtime::Acceptance;

/// Requested acceptance aggregation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptMode {
    /// Number of positions at which a match ends
    Count,
    /// Whether any match occurs; upgraded to `Universal` for single-repeat patterns
    #[default]
    Exists,
    /// Whether every consumed byte continues the match
    Universal,
}

impl AcceptMode {
    pub fn acceptance(self) -> Acceptance {
        match self {
            AcceptMode::Count => Acceptance::Count,
            AcceptMode::Exists => Acceptance::Exists,
            AcceptMode::Universal => Acceptance::Universal,
        }
    }
}

impl std::str::FromStr for AcceptMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count" => Ok(AcceptMode::Count),
            "exists" => Ok(AcceptMode::Exists),
            "universal" => Ok(AcceptMode::Universal),
            other => Err(format!("unknown acceptance mode '{}'", other)),
        }
    }
}

/// One requested reveal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RevealRequest {
    /// Reveal the bytes matched by a sub-pattern appearing verbatim in the pattern
    Substring {
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Reveal the bytes consumed on explicit `(from, to)` edges of the minimal automaton
    Edges { name: String, edges: Vec<(usize, usize)> },
}

impl RevealRequest {
    pub fn substring(pattern: impl Into<String>) -> Self {
        RevealRequest::Substring { pattern: pattern.into(), name: None }
    }

    /// Name of the reveal vector; defaults to the sub-pattern text
    pub fn name(&self) -> &str {
        match self {
            RevealRequest::Substring { name: Some(name), .. } => name,
            RevealRequest::Substring { pattern, name: None } => pattern,
            RevealRequest::Edges { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub acceptance: AcceptMode,
    pub reveals: Vec<RevealRequest>,
}

impl CompileOptions {
    pub fn new(acceptance: AcceptMode) -> Self {
        Self { acceptance, reveals: Vec::new() }
    }

    pub fn with_reveal(mut self, reveal: RevealRequest) -> Self {
        self.reveals.push(reveal);
        self
    }

    pub fn reveal_substring(self, pattern: impl Into<String>) -> Self {
        self.with_reveal(RevealRequest::substring(pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = CompileOptions::default();
        assert_eq!(options.acceptance, AcceptMode::Exists);
        assert!(options.reveals.is_empty());
    }

    #[test]
    fn test_options_from_json() {
        let json = r#"{
            "acceptance": "count",
            "reveals": [
                {"kind": "substring", "pattern": "(a|b)"},
                {"kind": "edges", "name": "tail", "edges": [[1, 2], [2, 2]]}
            ]
        }"#;
        let options: CompileOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.acceptance, AcceptMode::Count);
        assert_eq!(options.reveals[0], RevealRequest::substring("(a|b)"));
        assert_eq!(options.reveals[0].name(), "(a|b)");
        assert_eq!(
            options.reveals[1],
            RevealRequest::Edges { name: "tail".to_string(), edges: vec![(1, 2), (2, 2)] }
        );
    }

    #[test]
    fn test_missing_fields_default() {
        let options: CompileOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, CompileOptions::default());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("universal".parse::<AcceptMode>(), Ok(AcceptMode::Universal));
        assert!("sometimes".parse::<AcceptMode>().is_err());
    }
}

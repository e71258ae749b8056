//! Contract source and the invariants inferred for it.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::InputError;

/// Name used when the source declares no contract.
pub const UNNAMED_CONTRACT: &str = "UnnamedContract";

/// Name of the contract under test, as declared in the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractName(String);

impl ContractName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when no declaration was found and the sentinel name is in use.
    pub fn is_placeholder(&self) -> bool {
        self.0 == UNNAMED_CONTRACT
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)//[^\n]*|/\*.*?\*/").expect("static regex is valid"))
}

/// A declaration starts a line or follows the end of a previous item.
fn contract_decl_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)(?:^|[;{}])\s*(?:abstract\s+)?contract\s+([A-Za-z_$][A-Za-z0-9_$]*)")
            .expect("static regex is valid")
    })
}

/// Return the name of the first declared contract, ignoring comments.
pub fn extract_contract_name(source: &str) -> Option<String> {
    let code = comment_regex().replace_all(source, " ");
    contract_decl_regex()
        .captures(&code)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Property function declared by the harness for the invariant at `position`.
pub fn property_name(position: usize) -> String {
    format!("echidna_invariant_{position}")
}

/// Immutable contract source with its extracted name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSource {
    text: String,
    name: ContractName,
}

impl ContractSource {
    /// Wrap contract text. Whitespace-only text is rejected.
    pub fn new(text: impl Into<String>) -> Result<Self, InputError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(InputError::EmptySource);
        }
        let name = extract_contract_name(&text).unwrap_or_else(|| UNNAMED_CONTRACT.to_string());
        Ok(Self {
            text,
            name: ContractName(name),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn name(&self) -> &ContractName {
        &self.name
    }
}

/// A natural-language invariant and its 1-based position in the inference order.
///
/// The position names everything derived from the invariant (harness contract,
/// property function, scratch files) so results correlate back by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invariant {
    position: usize,
    statement: String,
}

impl Invariant {
    pub fn new(position: usize, statement: impl AsRef<str>) -> Result<Self, InputError> {
        if position == 0 {
            return Err(InputError::ZeroPosition);
        }
        let statement = statement.as_ref().trim();
        if statement.is_empty() {
            return Err(InputError::EmptyInvariant { position });
        }
        Ok(Self {
            position,
            statement: statement.to_string(),
        })
    }

    /// Number a list of statements 1..=N in order.
    pub fn from_statements<I, S>(statements: I) -> Result<Vec<Self>, InputError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let invariants = statements
            .into_iter()
            .enumerate()
            .map(|(i, s)| Self::new(i + 1, s))
            .collect::<Result<Vec<_>, _>>()?;
        if invariants.is_empty() {
            return Err(InputError::NoInvariants);
        }
        Ok(invariants)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Property function declared by the harness, e.g. `echidna_invariant_3`.
    pub fn property_name(&self) -> String {
        property_name(self.position)
    }

    /// Harness contract name, used as the engine's `--contract` filter.
    pub fn harness_contract(&self) -> String {
        format!("EchidnaTest_{}", self.position)
    }

    pub fn harness_file_name(&self) -> String {
        format!("invariant_{}_test.sol", self.position)
    }

    pub fn config_file_name(&self) -> String {
        format!("invariant_{}_echidna.yaml", self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_first_contract_name() {
        let src = "pragma solidity ^0.8.0;\n\ncontract Token {\n}\ncontract Other {}\n";
        assert_eq!(extract_contract_name(src).as_deref(), Some("Token"));
    }

    #[test]
    fn test_abstract_contract_is_a_declaration() {
        let src = "abstract contract Base { }";
        assert_eq!(extract_contract_name(src).as_deref(), Some("Base"));
    }

    #[test]
    fn test_natspec_mentions_are_not_declarations() {
        let src = "// SPDX-License-Identifier: MIT\npragma solidity ^0.8.0;\n\n/// @notice This contract holds deposits\n/**\n * @dev contract Legacy was replaced\n */\ncontract Vault {\n    // contract Inner is not real\n}\n";
        assert_eq!(extract_contract_name(src).as_deref(), Some("Vault"));
    }

    #[test]
    fn test_declaration_after_other_items() {
        let src = "import \"./A.sol\"; interface IA { } contract B is IA { }";
        assert_eq!(extract_contract_name(src).as_deref(), Some("B"));
    }

    #[test]
    fn test_contractual_is_not_a_keyword() {
        assert_eq!(extract_contract_name("uint contractual = 1;"), None);
    }

    #[test]
    fn test_missing_declaration_falls_back_to_placeholder() {
        let source = ContractSource::new("library Math { }").unwrap();
        assert_eq!(source.name().as_str(), UNNAMED_CONTRACT);
        assert!(source.name().is_placeholder());
    }

    #[test]
    fn test_blank_source_rejected() {
        assert_eq!(ContractSource::new("  \n\t"), Err(InputError::EmptySource));
    }

    #[test]
    fn test_invariants_numbered_from_one() {
        let invs = Invariant::from_statements(["  total supply is constant ", "balances >= 0"]).unwrap();
        assert_eq!(invs.len(), 2);
        assert_eq!(invs[0].position(), 1);
        assert_eq!(invs[0].statement(), "total supply is constant");
        assert_eq!(invs[1].property_name(), "echidna_invariant_2");
        assert_eq!(invs[1].harness_contract(), "EchidnaTest_2");
        assert_eq!(invs[1].harness_file_name(), "invariant_2_test.sol");
    }

    #[test]
    fn test_empty_invariant_list_rejected() {
        let none: Vec<&str> = Vec::new();
        assert_eq!(Invariant::from_statements(none), Err(InputError::NoInvariants));
    }

    #[test]
    fn test_blank_invariant_reports_position() {
        let err = Invariant::from_statements(["ok", "   "]).unwrap_err();
        assert_eq!(err, InputError::EmptyInvariant { position: 2 });
    }
}

// src/schema/types.rs

use serde::Serialize;
use std::fmt;

/// Canonical meaning a raw column can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Role {
    RegistryId,
    TaxId,
    LegalName,
    Region,
    AccountValue,
    AccountDescription,
    Period,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::RegistryId => "registry_id",
            Role::TaxId => "tax_id",
            Role::LegalName => "legal_name",
            Role::Region => "region",
            Role::AccountValue => "account_value",
            Role::AccountDescription => "account_description",
            Role::Period => "period",
        };
        f.write_str(s)
    }
}

/// A test against a normalized column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    Contains(&'static str),
    Exact(&'static str),
}

impl Matcher {
    pub fn matches(&self, normalized: &str) -> bool {
        match self {
            Matcher::Contains(token) => normalized.contains(token),
            Matcher::Exact(token) => normalized == *token,
        }
    }
}

/// A column bound to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    /// Position in the raw header.
    pub index: usize,
    /// Raw column name as the file spells it.
    pub column: String,
}

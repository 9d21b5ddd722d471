// src/schema/mapper.rs

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use super::types::{Binding, Matcher, Role};
use Matcher::{Contains, Exact};

/// Roles in evaluation order, each with its matchers in priority order.
/// Earlier roles claim columns first.
pub const ROLE_TABLE: &[(Role, &[Matcher])] = &[
    (
        Role::RegistryId,
        &[
            Contains("REGISTROOPERADORA"),
            Contains("REGISTROANS"),
            Contains("REGANS"),
            Contains("CDOP"),
            Contains("CODOP"),
            Contains("REGISTRO"),
        ],
    ),
    (Role::TaxId, &[Contains("CNPJ")]),
    (Role::LegalName, &[Contains("RAZAO"), Contains("NOME")]),
    (Role::Region, &[Exact("UF")]),
    (
        Role::AccountValue,
        &[
            Contains("VLSALDOFINAL"),
            Contains("VALORDESPESAS"),
            Contains("VALOR"),
            Contains("VLSALDO"),
        ],
    ),
    (Role::AccountDescription, &[Contains("DESC")]),
    (
        Role::Period,
        &[
            Exact("DATA"),
            Contains("TRIMESTRE"),
            Contains("COMPETENCIA"),
            Contains("DATA"),
        ],
    ),
];

fn fold_accent(c: char) -> char {
    match c {
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'Ç' => 'C',
        'Ñ' => 'N',
        other => other,
    }
}

/// Upper-case, fold accents, keep only letters and digits.
/// `" Razão_Social "` becomes `"RAZAOSOCIAL"`.
pub fn normalize_column_name(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_uppercase)
        .map(fold_accent)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// First column whose normalized name contains `DESC`, whether or not
/// [`map_columns`] gave that column to an earlier role.
pub fn description_column<S: AsRef<str>>(headers: &[S]) -> Option<usize> {
    headers
        .iter()
        .position(|h| normalize_column_name(h.as_ref()).contains("DESC"))
}

/// Role bindings for one table header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMap {
    bindings: BTreeMap<Role, Binding>,
}

impl ColumnMap {
    pub fn get(&self, role: Role) -> Option<&Binding> {
        self.bindings.get(&role)
    }

    pub fn index(&self, role: Role) -> Option<usize> {
        self.bindings.get(&role).map(|b| b.index)
    }

    pub fn is_bound(&self, role: Role) -> bool {
        self.bindings.contains_key(&role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Role, &Binding)> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Bind raw column names to roles.
///
/// Deterministic for a given header: roles are evaluated in [`ROLE_TABLE`]
/// order, matchers in priority order, columns in source order. A column is
/// bound to at most one role and a role to at most one column; roles with no
/// match are simply absent.
pub fn map_columns<S: AsRef<str>>(headers: &[S]) -> ColumnMap {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| normalize_column_name(h.as_ref()))
        .collect();

    let mut claimed: HashSet<usize> = HashSet::new();
    let mut bindings = BTreeMap::new();

    for (role, matchers) in ROLE_TABLE {
        let found = matchers.iter().find_map(|m| {
            normalized
                .iter()
                .enumerate()
                .find(|(i, name)| !claimed.contains(i) && m.matches(name))
                .map(|(i, _)| i)
        });
        if let Some(index) = found {
            claimed.insert(index);
            let column = headers[index].as_ref().to_string();
            debug!(%role, column = %column, "bound column");
            bindings.insert(*role, Binding { index, column });
        }
    }

    ColumnMap { bindings }
}

//! Launch configuration shared by the CLI and the DAP `launch` request.

use crate::error::ConfigError;
use crate::executor::MapVariables;
use crate::parser::parse_formula;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const KEYWORDS: [&str; 3] = ["and", "or", "not"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfig {
    pub formula: String,
    #[serde(default)]
    pub variables: BTreeMap<String, serde_json::Value>,
    #[serde(default = "default_stop_on_entry")]
    pub stop_on_entry: bool,
}

fn default_stop_on_entry() -> bool {
    true
}

impl LaunchConfig {
    pub fn new(formula: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            variables: BTreeMap::new(),
            stop_on_entry: true,
        }
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Convert the JSON variables into formula values, rejecting names a formula
    /// could never reference.
    pub fn to_variables(&self) -> Result<MapVariables, ConfigError> {
        let mut vars = MapVariables::new();
        for (name, json) in &self.variables {
            check_variable_name(name)?;
            vars.insert(name.clone(), Value::from(json.clone()));
        }
        Ok(vars)
    }
}

/// Parse a `NAME=FORMULA` assignment. The formula is evaluated without variables.
pub fn parse_assignment(assignment: &str) -> Result<(String, Value), ConfigError> {
    let Some((name, formula)) = assignment.split_once('=') else {
        return Err(ConfigError::InvalidVariable {
            name: assignment.to_string(),
            reason: "expected NAME=VALUE".to_string(),
        });
    };
    let name = name.trim();
    check_variable_name(name)?;

    let invalid = |reason: String| ConfigError::InvalidVariable {
        name: name.to_string(),
        reason,
    };
    let node = parse_formula(formula).map_err(|err| invalid(err.to_string()))?;
    let value = node
        .evaluate(&MapVariables::new())
        .map_err(|err| invalid(err.to_string()))?;
    Ok((name.to_string(), value))
}

fn check_variable_name(name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !KEYWORDS.contains(&name);
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidVariable {
            name: name.to_string(),
            reason: "not a valid identifier".to_string(),
        })
    }
}

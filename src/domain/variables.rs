// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! User supplied variables (`--var NAME=VALUE`) and output masking

use crate::shared::error::{OktetoError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MASK: &str = "***";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployVariable {
    pub name: String,
    pub value: String,
}

impl DeployVariable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// `NAME=VALUE` as passed to a child process environment.
    pub fn as_env(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

impl FromStr for DeployVariable {
    type Err = OktetoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok(DeployVariable::new(name.trim(), value))
            }
            _ => Err(OktetoError::user(format!(
                "invalid variable value '{}': must follow KEY=VALUE format",
                s
            ))),
        }
    }
}

impl fmt::Display for DeployVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Encodes variables the way they are stored in the status ConfigMap.
/// Returns an empty string when there is nothing to store.
pub fn encode_variables(variables: &[DeployVariable]) -> Result<String> {
    if variables.is_empty() {
        return Ok(String::new());
    }
    let json = serde_json::to_vec(variables)?;
    Ok(STANDARD.encode(json))
}

pub fn decode_variables(encoded: &str) -> Result<Vec<DeployVariable>> {
    if encoded.trim().is_empty() {
        return Ok(Vec::new());
    }
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| OktetoError::config_error(format!("invalid encoded variables: {}", e)))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Replaces registered secret values in text shown to the user.
#[derive(Debug, Clone, Default)]
pub struct Masker {
    words: Vec<String>,
}

impl Masker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_variables(variables: &[DeployVariable]) -> Self {
        let mut masker = Self::new();
        for variable in variables {
            masker.add(&variable.value);
        }
        masker
    }

    pub fn add(&mut self, word: &str) {
        if word.is_empty() || self.words.iter().any(|w| w == word) {
            return;
        }
        self.words.push(word.to_string());
        // longest first so that overlapping values are fully hidden
        self.words.sort_by_key(|w| std::cmp::Reverse(w.len()));
    }

    pub fn mask(&self, text: &str) -> String {
        let mut masked = text.to_string();
        for word in &self.words {
            masked = masked.replace(word.as_str(), MASK);
        }
        masked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variable() {
        let var: DeployVariable = "TOKEN=a=b".parse().unwrap();
        assert_eq!(var, DeployVariable::new("TOKEN", "a=b"));
        assert!("NOVALUE".parse::<DeployVariable>().is_err());
        assert!("=value".parse::<DeployVariable>().is_err());
    }

    #[test]
    fn test_encode_decode_variables() {
        let vars = vec![
            DeployVariable::new("A", "1"),
            DeployVariable::new("B", "two words"),
        ];
        let encoded = encode_variables(&vars).unwrap();
        assert!(!encoded.contains("two words"));
        assert_eq!(decode_variables(&encoded).unwrap(), vars);
        assert_eq!(encode_variables(&[]).unwrap(), "");
        assert!(decode_variables("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_variables("not base64 !!").is_err());
    }

    #[test]
    fn test_masker() {
        let masker = Masker::from_variables(&[
            DeployVariable::new("PASSWORD", "hunter2"),
            DeployVariable::new("PREFIX", "hunter"),
            DeployVariable::new("EMPTY", ""),
        ]);
        assert_eq!(masker.mask("login with hunter2"), "login with ***");
        assert_eq!(masker.mask("hunter"), "***");
        assert_eq!(masker.mask("nothing here"), "nothing here");
    }
}

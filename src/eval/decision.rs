use std::fmt::{self, Write as _};

use serde_json::{Map, Value};

/// One matrix entry to leave out, e.g. `{"python-version": "3.7"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub dimension: &'static str,
    pub value: String,
}

impl Exclusion {
    pub fn python_version(value: impl Into<String>) -> Self {
        Self {
            dimension: "python-version",
            value: value.into(),
        }
    }
}

/// Value of a single named output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputValue {
    Bool(bool),
    Text(String),
    List(Vec<String>),
    Exclusions(Vec<Exclusion>),
}

impl OutputValue {
    /// Native JSON form, used by the JSON output format.
    pub fn to_json(&self) -> Value {
        match self {
            OutputValue::Bool(b) => Value::Bool(*b),
            OutputValue::Text(s) => Value::String(s.clone()),
            OutputValue::List(items) => Value::from(items.clone()),
            OutputValue::Exclusions(items) => Value::Array(
                items
                    .iter()
                    .map(|e| {
                        let mut map = Map::new();
                        map.insert(e.dimension.to_string(), Value::String(e.value.clone()));
                        Value::Object(map)
                    })
                    .collect(),
            ),
        }
    }
}

/// Writes `s` the way a Python literal reads: single-quoted unless the
/// text itself holds a single quote and no double quote.
fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    f.write_char(quote)?;
    for c in s.chars() {
        if c == '\\' || c == quote {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char(quote)
}

/// Booleans render lowercase and strings verbatim. Lists and exclusions use
/// Python literal syntax (`['3.7', '3.8']`, `[{'python-version': '3.7'}]`),
/// which is what workflow steps downstream of the output variables parse.
impl fmt::Display for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputValue::Bool(b) => write!(f, "{b}"),
            OutputValue::Text(s) => f.write_str(s),
            OutputValue::List(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_quoted(f, item)?;
                }
                f.write_char(']')
            }
            OutputValue::Exclusions(items) => {
                f.write_char('[')?;
                for (i, e) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_char('{')?;
                    write_quoted(f, e.dimension)?;
                    f.write_str(": ")?;
                    write_quoted(f, &e.value)?;
                    f.write_char('}')?;
                }
                f.write_char(']')
            }
        }
    }
}

impl From<bool> for OutputValue {
    fn from(v: bool) -> Self {
        OutputValue::Bool(v)
    }
}

impl From<String> for OutputValue {
    fn from(v: String) -> Self {
        OutputValue::Text(v)
    }
}

impl From<&str> for OutputValue {
    fn from(v: &str) -> Self {
        OutputValue::Text(v.to_string())
    }
}

impl From<&[String]> for OutputValue {
    fn from(v: &[String]) -> Self {
        OutputValue::List(v.to_vec())
    }
}

impl From<&[Exclusion]> for OutputValue {
    fn from(v: &[Exclusion]) -> Self {
        OutputValue::Exclusions(v.to_vec())
    }
}

impl From<Vec<Exclusion>> for OutputValue {
    fn from(v: Vec<Exclusion>) -> Self {
        OutputValue::Exclusions(v)
    }
}

/// A named decision, as exposed to the CI platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Property name in snake_case, e.g. `run_tests`.
    pub name: &'static str,
    pub value: OutputValue,
}

impl Decision {
    pub fn new(name: &'static str, value: impl Into<OutputValue>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }

    /// Name as published to the CI platform (`run-tests`).
    pub fn output_name(&self) -> String {
        self.name.replace('_', "-")
    }
}

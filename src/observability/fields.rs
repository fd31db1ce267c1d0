//! Structured key/value fields shared by spans and log lines.

use std::borrow::Cow;
use std::fmt;

/// One structured key/value pair, e.g. `saldo.id=42`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    key: Cow<'static, str>,
    value: String,
}

impl Field {
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl ToString) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Renders a field slice as `k1=v1 k2=v2` for a single log field.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a>(pub &'a [Field]);

impl fmt::Display for Fields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{field}")?;
        }
        Ok(())
    }
}

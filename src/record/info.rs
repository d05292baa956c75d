use std::fmt;

/// Value of one INFO field on a record.
///
/// A key written without `=` on the line is a flag; its presence is stored as
/// `Flag(true)`. A flag set to `false` stays in the map but is never written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoValue {
    String(String),
    Flag(bool),
}

impl InfoValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            InfoValue::String(value) => Some(value),
            InfoValue::Flag(_) => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            InfoValue::String(value) => !value.is_empty(),
            InfoValue::Flag(present) => *present,
        }
    }
}

impl From<&str> for InfoValue {
    fn from(value: &str) -> Self {
        InfoValue::String(value.to_owned())
    }
}

impl From<String> for InfoValue {
    fn from(value: String) -> Self {
        InfoValue::String(value)
    }
}

impl From<bool> for InfoValue {
    fn from(present: bool) -> Self {
        InfoValue::Flag(present)
    }
}

impl PartialEq<&str> for InfoValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl fmt::Display for InfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoValue::String(value) => f.write_str(value),
            InfoValue::Flag(present) => write!(f, "{}", present),
        }
    }
}

/// Splits one `key=value` (or bare `key`) entry of the INFO column.
pub(crate) fn info_pair(entry: &str) -> (String, InfoValue) {
    match entry.split_once('=') {
        Some((key, value)) => (key.to_owned(), value.into()),
        None => (entry.to_owned(), InfoValue::Flag(true)),
    }
}

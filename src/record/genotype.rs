use getset::Getters;
use indexmap::IndexMap;
use itertools::Itertools;

pub(crate) const GT: &str = "GT";
pub(crate) const MISSING_CALL: &str = "./.";
pub(crate) const MISSING_VALUE: &str = ".";

/// One sample's call at a record, plus its other FORMAT sub-fields.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct Genotype {
    call: String,
    formats: IndexMap<String, String>,
}

impl Genotype {
    pub fn new<S: Into<String>>(call: S) -> Self {
        Genotype {
            call: call.into(),
            formats: IndexMap::new(),
        }
    }

    /// Stand-in for a sample that has no column on the line.
    pub fn missing() -> Self {
        Genotype::new(MISSING_CALL)
    }

    /// Value of one sub-field; `GT` resolves to the call.
    pub fn format(&self, tag: &str) -> Option<&str> {
        if tag == GT {
            Some(&self.call)
        } else {
            self.formats.get(tag).map(String::as_str)
        }
    }

    pub(crate) fn set_format<T: Into<String>, V: Into<String>>(&mut self, tag: T, value: V) {
        let tag = tag.into();
        if tag == GT {
            self.call = value.into();
        } else {
            self.formats.insert(tag, value.into());
        }
    }

    /// Pairs FORMAT tags with this sample's raw sub-field values. Trailing
    /// sub-fields a sample leaves out stay unset.
    pub(crate) fn set_formats(&mut self, tags: &[&str], values: &[&str]) {
        for (&tag, &value) in tags.iter().zip(values) {
            self.set_format(tag, value);
        }
    }

    /// Renders this sample's column for the given FORMAT order.
    pub fn to_column<S: AsRef<str>>(&self, format_order: &[S]) -> String {
        format_order
            .iter()
            .map(|tag| self.format(tag.as_ref()).unwrap_or(MISSING_VALUE))
            .join(":")
    }
}

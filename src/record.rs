mod genotype;
mod genotypes;
mod info;

use std::fmt;

use getset::{CopyGetters, Getters, Setters};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use tracing::trace;

use crate::error::{Error, Result};
use crate::header::{InfoType, SharedHeader, FIXED_COLUMNS};
use crate::parser;
pub use genotype::Genotype;
use genotypes::Genotypes;
pub use info::InfoValue;

const FORMAT_COLUMN_INDEX: usize = FIXED_COLUMNS.len();
const MISSING_INFO: &str = ".";

/// How the FORMAT and sample columns are produced on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenotypeOutput {
    /// Reuse the columns exactly as read while the genotypes are still unparsed.
    Cached,
    /// Always render the columns from the header's FORMAT order.
    Resynthesized,
}

impl Default for GenotypeOutput {
    fn default() -> Self {
        GenotypeOutput::Cached
    }
}

/// One data line of a VCF file.
///
/// CHROM through INFO are parsed on construction. The FORMAT and sample
/// columns are kept as text until a genotype is first asked for, so a record
/// that is only filtered or annotated is written back with its genotype
/// columns untouched.
#[derive(Debug, Clone, Getters, CopyGetters, Setters)]
pub struct Record {
    #[getset(get = "pub", set = "pub")]
    chrom: String,
    #[getset(get_copy = "pub", set = "pub")]
    pos: u64,
    #[getset(get = "pub", set = "pub")]
    id: String,
    #[getset(get = "pub", set = "pub")]
    ref_allele: String,
    #[getset(get = "pub", set = "pub")]
    alt: String,
    #[getset(get = "pub", set = "pub")]
    qual: String,
    #[getset(get = "pub", set = "pub")]
    filter: String,
    info: IndexMap<String, InfoValue>,
    #[getset(get = "pub")]
    active_formats: IndexSet<String>,
    active_format_order: Vec<String>,
    genotypes: Genotypes,
    #[getset(get = "pub")]
    header: SharedHeader,
}

impl Record {
    /// Parses a tab-delimited line. The sample columns are kept as one slice
    /// of the input.
    pub fn parse(line: &str, header: SharedHeader) -> Result<Self> {
        let mut columns = line.splitn(FORMAT_COLUMN_INDEX + 2, '\t').collect_vec();
        let samples = if columns.len() > FORMAT_COLUMN_INDEX + 1 {
            columns.pop()
        } else {
            None
        };
        Self::from_parts(&columns, samples, header)
    }

    /// Builds a record from a line already split into columns.
    pub fn from_columns<S: AsRef<str>>(columns: &[S], header: SharedHeader) -> Result<Self> {
        let (fixed, samples) = if columns.len() > FORMAT_COLUMN_INDEX + 1 {
            let (fixed, samples) = columns.split_at(FORMAT_COLUMN_INDEX + 1);
            (fixed, Some(samples.iter().map(AsRef::<str>::as_ref).join("\t")))
        } else {
            (columns, None)
        };
        let fixed = fixed.iter().map(AsRef::<str>::as_ref).collect_vec();
        Self::from_parts(&fixed, samples.as_deref(), header)
    }

    fn from_parts(
        columns: &[&str],
        samples: Option<&str>,
        header: SharedHeader,
    ) -> Result<Self> {
        if columns.len() < FORMAT_COLUMN_INDEX {
            return Err(Error::malformed_record(format!(
                "expected at least {} columns, found {}",
                FORMAT_COLUMN_INDEX,
                columns.len()
            )));
        }
        let (_, pos) = parser::position(columns[1]).map_err(|_| {
            Error::malformed_record(format!(
                "{}: position {:?} is not a non-negative integer",
                columns[0], columns[1]
            ))
        })?;
        let n_samples = samples.map_or(0, |samples| samples.split('\t').count());
        if n_samples > header.samples().len() {
            return Err(Error::malformed_record(format!(
                "{}:{}: {} sample columns but {} samples declared",
                columns[0],
                pos,
                n_samples,
                header.samples().len()
            )));
        }

        let format = columns.get(FORMAT_COLUMN_INDEX).copied();
        let active_formats: IndexSet<String> = format
            .unwrap_or_default()
            .split(':')
            .filter(|tag| !tag.is_empty())
            .map(str::to_owned)
            .collect();
        for tag in active_formats
            .iter()
            .filter(|tag| !header.format().contains_key(tag.as_str()))
        {
            trace!(tag = tag.as_str(), "FORMAT tag not declared in header");
        }

        let mut record = Record {
            chrom: columns[0].to_owned(),
            pos,
            id: columns[2].to_owned(),
            ref_allele: columns[3].to_owned(),
            alt: columns[4].to_owned(),
            qual: columns[5].to_owned(),
            filter: columns[6].to_owned(),
            info: parse_info(columns[7]),
            active_formats,
            active_format_order: Vec::new(),
            genotypes: Genotypes::Raw {
                format: format.map(str::to_owned),
                samples: samples.map(str::to_owned),
            },
            header,
        };
        record.update_active_format_list();
        Ok(record)
    }

    /// Value of an INFO field set on this record.
    pub fn info(&self, id: &str) -> Result<&InfoValue> {
        self.info
            .get(id)
            .ok_or_else(|| Error::UnknownInfoField { id: id.into() })
    }

    /// Sets an INFO field; the field must be declared in the header.
    pub fn set_info<V: Into<InfoValue>>(&mut self, id: &str, value: V) -> Result<()> {
        if !self.header.info().contains_key(id) {
            return Err(Error::UndeclaredInfoField { id: id.into() });
        }
        self.info.insert(id.to_owned(), value.into());
        Ok(())
    }

    /// Declared FORMAT tags that are active on this line, in header order.
    pub fn active_format_order(&self) -> &[String] {
        &self.active_format_order
    }

    /// Re-derives the active FORMAT order from the active tags. Tags the
    /// header does not declare never make it into the order.
    pub fn update_active_format_list(&mut self) {
        let active_formats = &self.active_formats;
        self.active_format_order = self
            .header
            .format()
            .keys()
            .filter(|id| active_formats.contains(id.as_str()))
            .cloned()
            .collect();
    }

    pub fn add_active_format(&mut self, tag: &str) {
        self.genotypes.materialize(&self.header);
        self.active_formats.insert(tag.to_owned());
        self.update_active_format_list();
    }

    pub fn remove_active_format(&mut self, tag: &str) {
        self.genotypes.materialize(&self.header);
        self.active_formats.shift_remove(tag);
        self.update_active_format_list();
    }

    /// Whether the genotype columns have been parsed.
    pub fn genotypes_parsed(&self) -> bool {
        self.genotypes.is_parsed()
    }

    /// Genotype of one sample. The first call parses the genotype columns of
    /// the whole record.
    pub fn genotype(&mut self, sample: &str) -> Result<&Genotype> {
        if !self.header.is_declared_sample(sample) {
            return Err(Error::UnknownSample {
                name: sample.into(),
            });
        }
        self.genotypes
            .materialize(&self.header)
            .get(sample)
            .ok_or_else(|| Error::UnknownSample {
                name: sample.into(),
            })
    }

    /// Sets one FORMAT sub-field of one sample and activates the tag on this
    /// line. `GT` sets the call.
    pub fn set_genotype_format(&mut self, sample: &str, tag: &str, value: &str) -> Result<()> {
        if !self.header.format().contains_key(tag) {
            return Err(Error::UndeclaredFormatField { id: tag.into() });
        }
        if !self.header.is_declared_sample(sample) {
            return Err(Error::UnknownSample {
                name: sample.into(),
            });
        }
        let genotype = self
            .genotypes
            .materialize(&self.header)
            .get_mut(sample)
            .ok_or_else(|| Error::UnknownSample {
                name: sample.into(),
            })?;
        genotype.set_format(tag, value);
        if self.active_formats.insert(tag.to_owned()) {
            self.update_active_format_list();
        }
        Ok(())
    }

    /// The INFO column: declared fields in header order, `.` when empty.
    pub fn info_string(&self) -> String {
        let entries = self
            .header
            .info()
            .values()
            .filter_map(|declared| {
                let id = declared.id();
                let value = self.info.get(id)?;
                match (declared.kind(), value) {
                    (InfoType::Flag, value) => value.is_truthy().then(|| id.clone()),
                    (_, InfoValue::String(value)) => Some(format!("{}={}", id, value)),
                    (_, InfoValue::Flag(present)) => present.then(|| id.clone()),
                }
            })
            .collect_vec();
        if entries.is_empty() {
            MISSING_INFO.to_owned()
        } else {
            entries.join(";")
        }
    }

    /// The FORMAT column.
    pub fn format_string(&self, mode: GenotypeOutput) -> String {
        match (&self.genotypes, mode) {
            (Genotypes::Raw { format, .. }, GenotypeOutput::Cached) => {
                format.clone().unwrap_or_default()
            }
            _ => self.active_format_order.join(":"),
        }
    }

    /// The sample columns, tab-joined in header sample order.
    pub fn genotypes_string(&self, mode: GenotypeOutput) -> Result<String> {
        match (&self.genotypes, mode) {
            (Genotypes::Raw { samples, .. }, GenotypeOutput::Cached) => {
                Ok(samples.clone().unwrap_or_default())
            }
            (Genotypes::Raw { format, samples }, GenotypeOutput::Resynthesized) => {
                let format = format.as_deref().unwrap_or_default();
                let parsed = genotypes::parse(&self.header, format, samples.as_deref());
                genotypes::synthesize(&self.header, &parsed, &self.active_format_order)
            }
            (Genotypes::Parsed(parsed), _) => {
                genotypes::synthesize(&self.header, parsed, &self.active_format_order)
            }
        }
    }

    fn has_genotype_data(&self, mode: GenotypeOutput) -> bool {
        match (&self.genotypes, mode) {
            (Genotypes::Raw { format, .. }, GenotypeOutput::Cached) => format.is_some(),
            _ => !self.active_format_order.is_empty(),
        }
    }

    // Cached output writes the sample columns only if the line had them; a
    // resynthesized record has one column per declared sample.
    fn has_sample_columns(&self, mode: GenotypeOutput) -> bool {
        match (&self.genotypes, mode) {
            (Genotypes::Raw { samples, .. }, GenotypeOutput::Cached) => samples.is_some(),
            _ => !self.header.samples().is_empty(),
        }
    }

    /// The full line, without a trailing newline.
    pub fn to_line(&self, mode: GenotypeOutput) -> Result<String> {
        let pos = self.pos.to_string();
        let info = self.info_string();
        let mut line = [
            self.chrom.as_str(),
            pos.as_str(),
            self.id.as_str(),
            self.ref_allele.as_str(),
            self.alt.as_str(),
            self.qual.as_str(),
            self.filter.as_str(),
            info.as_str(),
        ]
        .join("\t");
        if self.has_genotype_data(mode) {
            line.push('\t');
            line.push_str(&self.format_string(mode));
            if self.has_sample_columns(mode) {
                line.push('\t');
                line.push_str(&self.genotypes_string(mode)?);
            }
        }
        Ok(line)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = self
            .to_line(GenotypeOutput::Cached)
            .map_err(|_| fmt::Error)?;
        f.write_str(&line)
    }
}

fn parse_info(column: &str) -> IndexMap<String, InfoValue> {
    if column == MISSING_INFO {
        return IndexMap::new();
    }
    column
        .split(';')
        .filter(|entry| !entry.is_empty())
        .map(info::info_pair)
        .collect()
}

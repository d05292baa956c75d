use indexmap::IndexMap;
use itertools::Itertools;
use tracing::debug;

use super::genotype::Genotype;
use crate::error::{Error, Result};
use crate::header::{Header, Sample};

/// Parsed genotypes, keyed by sample name in header order.
pub(crate) type SampleGenotypes = IndexMap<Sample, Genotype>;

/// Genotype columns of a record: either still the raw text of the line, or
/// parsed. Parsing is one-way; the raw text is dropped once it happens.
///
/// `None` means the line ended before that column; `Some("")` is a column
/// that is present but empty.
#[derive(Debug, Clone)]
pub(crate) enum Genotypes {
    Raw {
        format: Option<String>,
        samples: Option<String>,
    },
    Parsed(SampleGenotypes),
}

impl Genotypes {
    pub(crate) fn is_parsed(&self) -> bool {
        matches!(self, Genotypes::Parsed(_))
    }

    /// Parses the raw columns if that has not happened yet.
    pub(crate) fn materialize(&mut self, header: &Header) -> &mut SampleGenotypes {
        if let Genotypes::Raw { format, samples } = self {
            debug!(samples = header.samples().len(), "materializing genotypes");
            let parsed = parse(header, format.as_deref().unwrap_or(""), samples.as_deref());
            *self = Genotypes::Parsed(parsed);
        }
        match self {
            Genotypes::Parsed(parsed) => parsed,
            Genotypes::Raw { .. } => unreachable!("genotypes were just materialized"),
        }
    }
}

/// Builds one genotype per declared sample from the raw FORMAT and sample
/// columns. Samples without a column get the missing call; an empty column
/// gives an empty call.
pub(crate) fn parse(header: &Header, format: &str, samples: Option<&str>) -> SampleGenotypes {
    let tags = format.split(':').collect_vec();
    let mut columns = samples.map(|samples| samples.split('\t'));
    header
        .samples()
        .iter()
        .map(|name| {
            let genotype = match columns.as_mut().and_then(Iterator::next) {
                Some(column) => {
                    let values = column.split(':').collect_vec();
                    let mut genotype = Genotype::new(values[0]);
                    genotype.set_formats(&tags, &values);
                    genotype
                }
                None => Genotype::missing(),
            };
            (name.clone(), genotype)
        })
        .collect()
}

/// Joins every declared sample's column, in header order.
pub(crate) fn synthesize<S: AsRef<str>>(
    header: &Header,
    genotypes: &SampleGenotypes,
    format_order: &[S],
) -> Result<String> {
    let columns = header
        .samples()
        .iter()
        .map(|name| {
            genotypes
                .get(name)
                .map(|genotype| genotype.to_column(format_order))
                .ok_or(Error::SerializationFailure)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(columns.join("\t"))
}

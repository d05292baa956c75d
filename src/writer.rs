use std::io::Write;

use crate::header::Header;
use crate::record::{GenotypeOutput, Record};

/// Writes a header and records back out as VCF text.
pub struct Writer<W: Write> {
    inner: W,
    genotype_output: GenotypeOutput,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W) -> Self {
        Writer {
            inner,
            genotype_output: GenotypeOutput::default(),
        }
    }

    pub fn with_genotype_output(mut self, genotype_output: GenotypeOutput) -> Self {
        self.genotype_output = genotype_output;
        self
    }

    pub fn write_header(&mut self, header: &Header) -> anyhow::Result<()> {
        write!(self.inner, "{}", header)?;
        Ok(())
    }

    pub fn write_record(&mut self, record: &Record) -> anyhow::Result<()> {
        let line = record.to_line(self.genotype_output)?;
        writeln!(self.inner, "{}", line)?;
        Ok(())
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

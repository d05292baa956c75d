use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::error::Error;
use crate::header::{Header, SharedHeader};
use crate::record::Record;

/// Iterator over the records of a VCF text stream.
///
/// The header is read on construction; each data line becomes a [`Record`]
/// sharing it. Errors carry the 1-based line number as context and wrap a
/// [`crate::Error`] when the line itself is at fault.
pub struct VcfRecords<R: BufRead> {
    header: SharedHeader,
    line_buf: String,
    line_number: usize,
    inner: R,
}

impl<R: BufRead> VcfRecords<R> {
    pub fn header(&self) -> &Header {
        self.header.as_ref()
    }
}

/// Whether an error from [`VcfRecords`] is confined to one bad line, so the
/// stream can go on, rather than a failure of the stream itself.
pub fn is_record_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<Error>().is_some()
}

impl VcfRecords<Box<dyn BufRead>> {
    /// Opens a plain or compressed VCF file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let (reader, format) = niffler::from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        debug!(?format, path = %path.display(), "opened VCF");
        Self::new(Box::new(BufReader::new(reader)) as Box<dyn BufRead>)
    }
}

impl<R: BufRead> VcfRecords<R> {
    pub fn new(mut reader: R) -> anyhow::Result<Self> {
        let mut header = Header::default();
        let mut line_buf = String::new();
        let mut line_number = 0;
        while reader.fill_buf()?.first() == Some(&b'#') {
            line_buf.clear();
            reader.read_line(&mut line_buf)?;
            line_number += 1;
            let line = line_buf.trim_end_matches(&['\n', '\r'][..]);
            let parsed = if line.starts_with("##") {
                header.push_meta_line(line)
            } else {
                header.set_column_line(line)
            };
            parsed.with_context(|| format!("invalid header at line {}", line_number))?;
        }
        debug!(
            samples = header.samples().len(),
            info = header.info().len(),
            format = header.format().len(),
            "read header"
        );

        Ok(Self {
            header: SharedHeader::new(header),
            line_buf,
            line_number,
            inner: reader,
        })
    }
}

impl<R: BufRead> Iterator for VcfRecords<R> {
    type Item = anyhow::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_buf.clear();
            match self.inner.read_line(&mut self.line_buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line_number += 1;
            let line = self.line_buf.trim_end_matches(&['\n', '\r'][..]);
            if line.is_empty() {
                continue;
            }
            let line_number = self.line_number;
            return Some(
                Record::parse(line, self.header.clone())
                    .with_context(|| format!("invalid record at line {}", line_number)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs::File;
    use std::io::{self, Cursor, Read, Write};

    const VCF: &str = "##fileformat=VCFv4.2\n\
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\">\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
chr1\t100\t.\tA\tG\t.\tPASS\tAF=0.5\tGT\t0/1\n\
chr1\tabc\t.\tA\tG\t.\tPASS\tAF=0.5\tGT\t0/1\n\
\n\
chr1\t300\t.\tC\tT\t.\tPASS\tAF=0.1\tGT\t1/1\r\n";

    #[test]
    fn test_read_records() {
        let mut records = VcfRecords::new(Cursor::new(VCF)).unwrap();
        assert_eq!(records.header().samples(), &vec!["S1"]);

        let first = records.next().unwrap().unwrap();
        assert_eq!(first.pos(), 100);

        let err = records.next().unwrap().unwrap_err();
        assert_eq!(err.to_string(), "invalid record at line 6");
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MalformedRecord { .. })
        ));
        assert!(is_record_error(&err));

        // the bad line does not end the stream
        let mut last = records.next().unwrap().unwrap();
        assert_eq!(last.genotype("S1").unwrap().call(), "1/1");
        assert!(records.next().is_none());
    }

    struct Unreadable;

    impl Read for Unreadable {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "device went away"))
        }
    }

    #[test]
    fn test_stream_errors_are_not_record_errors() {
        let text = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\nchr1\t1\t.\tA\tC\t.\t.\t.\n";
        let reader = BufReader::new(Cursor::new(text).chain(Unreadable));
        let mut records = VcfRecords::new(reader).unwrap();
        assert!(records.next().unwrap().is_ok());
        let err = records.next().unwrap().unwrap_err();
        assert!(err.downcast_ref::<io::Error>().is_some());
        assert!(!is_record_error(&err));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("calls.vcf");
        File::create(&plain)
            .unwrap()
            .write_all(VCF.as_bytes())
            .unwrap();

        let gzipped = dir.path().join("calls.vcf.gz");
        let mut encoder = GzEncoder::new(File::create(&gzipped).unwrap(), Compression::default());
        encoder.write_all(VCF.as_bytes()).unwrap();
        encoder.finish().unwrap();

        for path in [plain, gzipped].iter() {
            let records = VcfRecords::from_path(path).unwrap();
            assert_eq!(records.header().samples(), &vec!["S1"]);
            let positions = records
                .filter_map(|record| record.ok())
                .map(|record| record.pos())
                .collect::<Vec<_>>();
            assert_eq!(positions, [100, 300]);
        }

        let err = VcfRecords::from_path(dir.path().join("missing.vcf"))
            .err()
            .unwrap();
        assert!(err.to_string().starts_with("failed to open"));
    }

    #[test]
    fn test_invalid_header() {
        let vcf = "##INFO=<ID=AF>\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";
        let err = VcfRecords::new(Cursor::new(vcf)).err().unwrap();
        assert_eq!(err.to_string(), "invalid header at line 1");
    }
}

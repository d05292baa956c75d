use std::convert::TryFrom;
use std::fmt;
#[cfg(not(feature = "sync"))]
use std::rc::Rc;
use std::str::FromStr;
#[cfg(feature = "sync")]
use std::sync::Arc;

use getset::{CopyGetters, Getters};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use multimap::MultiMap;
use strum::{Display, EnumString};

use crate::error::{Error, Result};
use crate::parser::{self, MetaValue};

/// Read-only handle on a header, shared by every record parsed against it.
#[cfg(not(feature = "sync"))]
pub type SharedHeader = Rc<Header>;
#[cfg(feature = "sync")]
pub type SharedHeader = Arc<Header>;

pub type Sample = String;

pub(crate) const FIXED_COLUMNS: [&str; 8] =
    ["#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO"];
const FORMAT_COLUMN: &str = "FORMAT";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumString, Display)]
pub enum InfoType {
    Integer,
    Float,
    Flag,
    Character,
    String,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum Number {
    Count(usize),
    Alleles,
    AlternateAlleles,
    Genotypes,
    Unknown,
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Count(n) => write!(f, "{}", n),
            Number::Alleles => f.write_str("R"),
            Number::AlternateAlleles => f.write_str("A"),
            Number::Genotypes => f.write_str("G"),
            Number::Unknown => f.write_str("."),
        }
    }
}

/// Any meta line other than INFO and FORMAT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    String(String),
    Structured(IndexMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct HeaderInfo {
    #[getset(get = "pub")]
    id: String,
    #[getset(get_copy = "pub")]
    number: Number,
    #[getset(get_copy = "pub")]
    kind: InfoType,
    #[getset(get = "pub")]
    description: String,
    #[getset(get = "pub")]
    source: Option<String>,
    #[getset(get = "pub")]
    version: Option<String>,
    #[getset(get = "pub")]
    additional: IndexMap<String, String>,
}

impl HeaderInfo {
    pub fn new<I: Into<String>, D: Into<String>>(
        id: I,
        number: Number,
        kind: InfoType,
        description: D,
    ) -> Self {
        HeaderInfo {
            id: id.into(),
            number,
            kind,
            description: description.into(),
            source: None,
            version: None,
            additional: IndexMap::new(),
        }
    }
}

fn take_mandatory<'a>(fields: &mut IndexMap<&'a str, &'a str>, key: &str) -> Result<&'a str> {
    fields
        .shift_remove(key)
        .ok_or_else(|| Error::malformed_header(format!("missing mandatory key {}", key)))
}

fn number_from_str(value: &str) -> Result<Number> {
    match parser::number(value) {
        Ok(("", number)) => Ok(number),
        _ => Err(Error::malformed_header(format!("invalid Number={}", value))),
    }
}

fn kind_from_str(value: &str) -> Result<InfoType> {
    InfoType::from_str(value)
        .map_err(|_| Error::malformed_header(format!("invalid Type={}", value)))
}

impl<'a> TryFrom<Vec<(&'a str, &'a str)>> for HeaderInfo {
    type Error = Error;

    fn try_from(data: Vec<(&'a str, &'a str)>) -> Result<Self> {
        let mut h: IndexMap<_, _> = data.into_iter().collect();
        Ok(HeaderInfo {
            id: take_mandatory(&mut h, "ID")?.into(),
            number: number_from_str(take_mandatory(&mut h, "Number")?)?,
            kind: kind_from_str(take_mandatory(&mut h, "Type")?)?,
            description: parser::unescape(take_mandatory(&mut h, "Description")?),
            source: h.shift_remove("Source").map(parser::unescape),
            version: h.shift_remove("Version").map(parser::unescape),
            additional: h
                .into_iter()
                .map(|(k, v)| (k.into(), parser::unescape(v)))
                .collect(),
        })
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn write_attribute(f: &mut fmt::Formatter<'_>, key: &str, value: &str) -> fmt::Result {
    if value.is_empty() || value.contains(|c: char| matches!(c, ',' | '>' | '"' | '\\' | ' ')) {
        write!(f, ",{}=\"{}\"", key, escape(value))
    } else {
        write!(f, ",{}={}", key, value)
    }
}

impl fmt::Display for HeaderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "##INFO=<ID={},Number={},Type={},Description=\"{}\"",
            self.id,
            self.number,
            self.kind,
            escape(&self.description)
        )?;
        if let Some(source) = &self.source {
            write!(f, ",Source=\"{}\"", escape(source))?;
        }
        if let Some(version) = &self.version {
            write!(f, ",Version=\"{}\"", escape(version))?;
        }
        for (key, value) in &self.additional {
            write_attribute(f, key, value)?;
        }
        f.write_str(">")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct HeaderFormat {
    #[getset(get = "pub")]
    id: String,
    #[getset(get_copy = "pub")]
    number: Number,
    #[getset(get_copy = "pub")]
    kind: InfoType,
    #[getset(get = "pub")]
    description: String,
}

impl HeaderFormat {
    pub fn new<I: Into<String>, D: Into<String>>(
        id: I,
        number: Number,
        kind: InfoType,
        description: D,
    ) -> Self {
        HeaderFormat {
            id: id.into(),
            number,
            kind,
            description: description.into(),
        }
    }
}

impl<'a> TryFrom<Vec<(&'a str, &'a str)>> for HeaderFormat {
    type Error = Error;

    fn try_from(data: Vec<(&'a str, &'a str)>) -> Result<Self> {
        let mut h: IndexMap<_, _> = data.into_iter().collect();
        Ok(HeaderFormat {
            id: take_mandatory(&mut h, "ID")?.into(),
            number: number_from_str(take_mandatory(&mut h, "Number")?)?,
            kind: kind_from_str(take_mandatory(&mut h, "Type")?)?,
            description: parser::unescape(take_mandatory(&mut h, "Description")?),
        })
    }
}

impl fmt::Display for HeaderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "##FORMAT=<ID={},Number={},Type={},Description=\"{}\">",
            self.id,
            self.number,
            self.kind,
            escape(&self.description)
        )
    }
}

/// The header context records are parsed against: declared samples, INFO and
/// FORMAT fields (in declaration order) and every other meta line.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct Header {
    meta: MultiMap<String, HeaderValue>,
    info: IndexMap<String, HeaderInfo>,
    format: IndexMap<String, HeaderFormat>,
    samples: Vec<Sample>,
    // meta lines as written, in input order
    #[getset(skip)]
    lines: Vec<String>,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            meta: MultiMap::new(),
            info: IndexMap::new(),
            format: IndexMap::new(),
            samples: Vec::new(),
            lines: Vec::new(),
        }
    }
}

impl Header {
    /// An empty header declaring the given samples. Sample names must be
    /// unique.
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        let mut header = Header::default();
        header.set_samples(samples)?;
        Ok(header)
    }

    fn set_samples(&mut self, samples: Vec<Sample>) -> Result<()> {
        let mut seen = IndexSet::with_capacity(samples.len());
        if let Some(duplicate) = samples.iter().find(|&name| !seen.insert(name.as_str())) {
            return Err(Error::DuplicateHeaderField {
                key: "sample".into(),
                id: duplicate.clone(),
            });
        }
        self.samples = samples;
        Ok(())
    }

    /// Adds a plain `##key=value` line.
    pub fn add_meta<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let (key, value) = (key.into(), value.into());
        self.lines.push(format!("##{}={}", key, value));
        self.meta.insert(key, HeaderValue::String(value));
    }

    pub fn add_info(&mut self, info: HeaderInfo) -> Result<()> {
        let line = info.to_string();
        self.insert_info(info, line)
    }

    pub fn add_format(&mut self, format: HeaderFormat) -> Result<()> {
        let line = format.to_string();
        self.insert_format(format, line)
    }

    fn insert_info(&mut self, info: HeaderInfo, line: String) -> Result<()> {
        if self.info.contains_key(info.id()) {
            return Err(Error::DuplicateHeaderField {
                key: "INFO".into(),
                id: info.id().clone(),
            });
        }
        self.lines.push(line);
        self.info.insert(info.id().clone(), info);
        Ok(())
    }

    fn insert_format(&mut self, format: HeaderFormat, line: String) -> Result<()> {
        if self.format.contains_key(format.id()) {
            return Err(Error::DuplicateHeaderField {
                key: "FORMAT".into(),
                id: format.id().clone(),
            });
        }
        self.lines.push(line);
        self.format.insert(format.id().clone(), format);
        Ok(())
    }

    /// Declared type of an INFO field, if the field is declared at all.
    pub fn info_type(&self, id: &str) -> Option<InfoType> {
        self.info.get(id).map(HeaderInfo::kind)
    }

    pub fn is_declared_sample(&self, name: &str) -> bool {
        self.samples.iter().any(|s| s == name)
    }

    /// Parses one `##` meta line and records it.
    pub fn push_meta_line(&mut self, line: &str) -> Result<()> {
        let (_, (key, value)) =
            parser::meta_line(line).map_err(|_| Error::malformed_header(line))?;
        match (key, value) {
            ("INFO", MetaValue::Structured(data)) => {
                let info =
                    HeaderInfo::try_from(data).map_err(|_| Error::malformed_header(line))?;
                self.insert_info(info, line.into())
            }
            ("FORMAT", MetaValue::Structured(data)) => {
                let format =
                    HeaderFormat::try_from(data).map_err(|_| Error::malformed_header(line))?;
                self.insert_format(format, line.into())
            }
            ("INFO", _) | ("FORMAT", _) => Err(Error::malformed_header(line)),
            (key, MetaValue::Structured(data)) => {
                let data = data
                    .into_iter()
                    .map(|(k, v)| (k.to_owned(), parser::unescape(v)))
                    .collect();
                self.meta.insert(key.into(), HeaderValue::Structured(data));
                self.lines.push(line.into());
                Ok(())
            }
            (key, MetaValue::String(value)) => {
                self.meta.insert(key.into(), HeaderValue::String(value.into()));
                self.lines.push(line.into());
                Ok(())
            }
        }
    }

    /// Parses the `#CHROM ...` line, taking the sample names from it.
    pub fn set_column_line(&mut self, line: &str) -> Result<()> {
        let columns = line.split('\t').collect_vec();
        if columns.len() < FIXED_COLUMNS.len() || columns[..FIXED_COLUMNS.len()] != FIXED_COLUMNS
        {
            return Err(Error::malformed_header(line));
        }
        let samples = match columns.get(FIXED_COLUMNS.len()) {
            None => Vec::new(),
            Some(&FORMAT_COLUMN) => columns[FIXED_COLUMNS.len() + 1..]
                .iter()
                .map(|&s| s.to_owned())
                .collect(),
            Some(_) => return Err(Error::malformed_header(line)),
        };
        self.set_samples(samples)
    }
}

impl FromStr for Header {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut header = Header::default();
        for line in s.lines().filter(|line| !line.is_empty()) {
            if line.starts_with("##") {
                header.push_meta_line(line)?;
            } else if line.starts_with("#CHROM") {
                header.set_column_line(line)?;
            } else {
                return Err(Error::malformed_header(line));
            }
        }
        Ok(header)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        f.write_str(&FIXED_COLUMNS.join("\t"))?;
        if !self.samples.is_empty() {
            write!(f, "\t{}\t{}", FORMAT_COLUMN, self.samples.join("\t"))?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "##fileformat=VCFv4.2\n\
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\">\n\
##INFO=<ID=DB,Number=0,Type=Flag,Description=\"dbSNP membership\",\
Source=\"dbsnp\",Version=\"138\">\n\
##FILTER=<ID=q10,Description=\"Quality below 10\">\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Read depth\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\n";

    #[test]
    fn test_parse_header() {
        let header: Header = HEADER.parse().unwrap();
        assert_eq!(header.samples(), &vec!["S1", "S2"]);
        assert_eq!(header.info().keys().collect_vec(), ["AF", "DB"]);
        assert_eq!(header.format().keys().collect_vec(), ["GT", "DP"]);
        assert_eq!(header.info_type("DB"), Some(InfoType::Flag));
        assert_eq!(header.info_type("XX"), None);

        let db = &header.info()["DB"];
        assert_eq!(db.number(), Number::Count(0));
        assert_eq!(db.source().as_deref(), Some("dbsnp"));
        assert_eq!(db.version().as_deref(), Some("138"));

        assert_eq!(
            header.meta().get("fileformat"),
            Some(&HeaderValue::String("VCFv4.2".into()))
        );
        assert!(matches!(
            header.meta().get("FILTER"),
            Some(HeaderValue::Structured(filter)) if filter["ID"] == "q10"
        ));
    }

    #[test]
    fn test_header_round_trip() {
        let header: Header = HEADER.parse().unwrap();
        assert_eq!(header.to_string(), HEADER);
    }

    #[test]
    fn test_sites_only_header() {
        let header: Header = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n"
            .parse()
            .unwrap();
        assert!(header.samples().is_empty());
    }

    #[test]
    fn test_malformed_header_lines() {
        let missing_type = "##INFO=<ID=AF,Number=A,Description=\"Allele frequency\">";
        assert_eq!(
            missing_type.parse::<Header>().unwrap_err(),
            Error::MalformedHeader {
                line: missing_type.into()
            }
        );
        assert!("#CHROM\tPOS\n".parse::<Header>().is_err());
        assert!("chr1\t100\n".parse::<Header>().is_err());
    }

    #[test]
    fn test_programmatic_header() {
        let mut header = Header::new(vec!["S1".into()]).unwrap();
        header.add_meta("fileformat", "VCFv4.2");
        let af_number = Number::AlternateAlleles;
        let af = HeaderInfo::new("AF", af_number, InfoType::Float, "Allele frequency");
        header.add_info(af).unwrap();
        header
            .add_format(HeaderFormat::new("GT", Number::Count(1), InfoType::String, "Genotype"))
            .unwrap();
        assert_eq!(
            header
                .add_info(HeaderInfo::new("AF", Number::Count(1), InfoType::Float, "again"))
                .unwrap_err(),
            Error::DuplicateHeaderField {
                key: "INFO".into(),
                id: "AF".into()
            }
        );

        assert_eq!(
            header.to_string(),
            "##fileformat=VCFv4.2\n\
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\">\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n"
        );

        // the rendered lines parse back to the same declarations
        let reparsed: Header = header.to_string().parse().unwrap();
        assert_eq!(reparsed.info(), header.info());
        assert_eq!(reparsed.format(), header.format());
    }

    #[test]
    fn test_duplicate_samples() {
        let duplicate = Error::DuplicateHeaderField {
            key: "sample".into(),
            id: "S1".into(),
        };
        assert_eq!(
            Header::new(vec!["S1".into(), "S2".into(), "S1".into()]).unwrap_err(),
            duplicate
        );
        assert_eq!(
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS1\n"
                .parse::<Header>()
                .unwrap_err(),
            duplicate
        );
    }

    #[test]
    fn test_quoted_values_are_escaped() {
        let mut header = Header::default();
        let description = r#"say "hi" \ bye"#;
        let mut info = HeaderInfo::new("AN", Number::Count(1), InfoType::Integer, description);
        info.source = Some(r#"a "b""#.into());
        header.add_info(info.clone()).unwrap();
        header
            .add_format(HeaderFormat::new("XQ", Number::Count(1), InfoType::String, r#"x "q""#))
            .unwrap();

        let text = header.to_string();
        assert!(text.contains(r#"Description="say \"hi\" \\ bye",Source="a \"b\"">"#));
        let reparsed: Header = text.parse().unwrap();
        assert_eq!(reparsed.info()["AN"], info);
        assert_eq!(reparsed.format()["XQ"].description(), r#"x "q""#);
        assert_eq!(reparsed.to_string(), text);
    }
}

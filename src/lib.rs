pub mod error;
pub mod header;
pub(crate) mod parser;
pub mod reader;
pub mod record;
pub mod writer;

pub use error::{Error, Result};
pub use header::{Header, SharedHeader};
pub use reader::VcfRecords;
pub use record::{Genotype, GenotypeOutput, InfoValue, Record};
pub use writer::Writer;

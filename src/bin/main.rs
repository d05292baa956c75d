use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lazy_vcf::reader::is_record_error;
use lazy_vcf::{Error, GenotypeOutput, InfoValue, VcfRecords, Writer};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Rewrite VCF records, parsing genotypes only when needed",
    long_about = None
)]
struct Cli {
    /// Input VCF (plain or gzip-compressed).
    input: PathBuf,

    /// Output path; stdout if omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Render FORMAT and sample columns from the header instead of copying them.
    #[arg(long)]
    resynthesize: bool,

    /// Set an INFO field on every record, as ID=VALUE or ID for a flag.
    #[arg(long = "set-info", value_name = "ID[=VALUE]")]
    set_info: Vec<String>,

    /// Log and skip malformed records instead of stopping at the first one.
    #[arg(long)]
    skip_malformed: bool,
}

fn info_assignment(arg: &str) -> (&str, InfoValue) {
    match arg.split_once('=') {
        Some((id, value)) => (id, InfoValue::from(value)),
        None => (arg, InfoValue::Flag(true)),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let records = VcfRecords::from_path(&cli.input)?;
    let assignments = cli.set_info.iter().map(|arg| info_assignment(arg)).collect::<Vec<_>>();
    for (id, _) in &assignments {
        if !records.header().info().contains_key(*id) {
            bail!(Error::UndeclaredInfoField { id: id.to_string() });
        }
    }

    let output: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    let genotype_output = if cli.resynthesize {
        GenotypeOutput::Resynthesized
    } else {
        GenotypeOutput::Cached
    };
    let mut writer = Writer::new(output).with_genotype_output(genotype_output);
    writer.write_header(records.header())?;

    let (mut written, mut skipped) = (0usize, 0usize);
    for record in records {
        let mut record = match record {
            Ok(record) => record,
            Err(e) if cli.skip_malformed && is_record_error(&e) => {
                warn!("skipping {:#}", e);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        for (id, value) in &assignments {
            record.set_info(id, value.clone())?;
        }
        writer.write_record(&record)?;
        written += 1;
    }
    writer.flush()?;
    info!(written, skipped, "done");

    Ok(())
}

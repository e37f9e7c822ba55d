//! undbc - inspect and edit WoW client database files (.dbc / .db2)
//!
//! Usage:
//!   undbc info <file>                         - Show header information
//!   undbc dump <file> [--limit N]             - Print decoded records
//!   undbc strings <file>                      - Print the DBC string block
//!   undbc set <file> <rec> <field> <value>    - Edit one cell and save
//!   undbc set-string <file> <index> <value>   - Edit one string and save

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use undbc::{DbcFile, FileKind, Header};

#[derive(Parser)]
#[command(name = "undbc")]
#[command(version = "0.1.0")]
#[command(about = "Inspect and edit WoW client database files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show header information
    Info {
        /// Path to the .dbc/.db2 file
        file: PathBuf,
    },
    /// Print decoded records
    Dump {
        /// Path to the .dbc/.db2 file
        file: PathBuf,
        /// Maximum number of records to print
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Print the string block of a DBC file
    Strings {
        /// Path to the .dbc file
        file: PathBuf,
    },
    /// Set one record cell and save
    Set {
        /// Path to the .dbc/.db2 file
        file: PathBuf,
        /// Record index
        record: usize,
        /// Field index
        field: usize,
        /// New value (decimal or 0x-prefixed hex)
        value: String,
        /// Output path (defaults to the input file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Set one string-block entry and save (DBC only)
    SetString {
        /// Path to the .dbc file
        file: PathBuf,
        /// String index
        index: usize,
        /// New string value
        value: String,
        /// Output path (defaults to the input file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Info { file } => cmd_info(&file),
        Commands::Dump { file, limit } => cmd_dump(&file, limit),
        Commands::Strings { file } => cmd_strings(&file),
        Commands::Set {
            file,
            record,
            field,
            value,
            output,
        } => cmd_set(&file, record, field, &value, output),
        Commands::SetString {
            file,
            index,
            value,
            output,
        } => cmd_set_string(&file, index, &value, output),
    }
}

fn load_with_spinner(file: &PathBuf) -> Result<DbcFile> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner());
    spinner.set_message(format!("Loading {}...", file.display()));
    let table = DbcFile::load(file).with_context(|| format!("failed to load {}", file.display()))?;
    spinner.finish_and_clear();
    Ok(table)
}

fn cmd_info(file: &PathBuf) -> Result<()> {
    let table = load_with_spinner(file)?;

    match table.header() {
        Header::Dbc(h) => {
            println!("Type: DBC");
            println!("Signature: {}", h.signature);
            println!("Records: {}", h.record_count);
            println!("Fields: {}", h.field_count);
            println!("Record size: {} bytes", h.record_size);
            println!("String block: {} bytes", h.string_block_size);
        }
        Header::Db2(h) => {
            println!("Type: DB2");
            println!("Signature: {}", h.signature);
            println!("Version: {}", h.version);
            if !h.schema_name.is_empty() {
                println!("Schema: {}", h.schema_name);
            }
            println!("Records: {}", h.record_count);
            println!("Fields: {} (total {})", h.field_count, h.total_field_count);
            println!("Record size: {} bytes", h.record_size);
            println!("Table hash: 0x{:08X}", h.table_hash);
            println!("Layout hash: 0x{:08X}", h.layout_hash);
            println!("ID range: {} - {}", h.min_id, h.max_id);
            println!("Locale: {}", h.locale);
            println!("Flags: 0x{:04X}", h.flags);
            println!("Sections: {}", h.sections_count);
            if let Some(s) = &h.section {
                println!("Section:");
                println!("  TACT key: 0x{:016X}", s.tact_key_lookup);
                println!("  Data offset: {}", s.file_offset);
                println!("  Records: {}", s.num_records);
                println!("  Index data: {} bytes", s.index_data_size);
                println!("  Copy table entries: {}", s.copy_table_count);
            }
        }
    }
    Ok(())
}

fn cmd_dump(file: &PathBuf, limit: Option<usize>) -> Result<()> {
    let table = load_with_spinner(file)?;
    let limit = limit.unwrap_or(usize::MAX);

    let header = table.header();
    println!(
        "{}: {} records x {} fields ({} bytes/record)",
        header.signature(),
        header.record_count(),
        header.field_count(),
        header.record_size()
    );
    for (i, record) in table.records().iter().take(limit).enumerate() {
        let cells: Vec<String> = record.iter().map(|v| format_value(*v)).collect();
        println!("{:>6}: {}", i, cells.join("\t"));
    }
    if table.record_count() > limit {
        println!("... and {} more", table.record_count() - limit);
    }
    Ok(())
}

fn cmd_strings(file: &PathBuf) -> Result<()> {
    let table = load_with_spinner(file)?;
    let strings = match table.strings() {
        Some(s) => s,
        None => bail!("{} is not a DBC file; DB2 files carry no string block", file.display()),
    };
    for (i, s) in strings.iter().enumerate() {
        println!("{:>6}: {}", i, s);
    }
    Ok(())
}

fn cmd_set(
    file: &PathBuf,
    record: usize,
    field: usize,
    value: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let parsed = parse_value(value)?;
    let mut table = load_with_spinner(file)?;
    if !table.update_record(record, field, parsed) {
        bail!(
            "index out of range: record {} field {} (table is {} x {})",
            record,
            field,
            table.record_count(),
            table.fields().len()
        );
    }
    table.save(output.as_deref())?;
    println!("Record [{}, {}] set to {}", record, field, format_value(parsed));
    Ok(())
}

fn cmd_set_string(file: &PathBuf, index: usize, value: &str, output: Option<PathBuf>) -> Result<()> {
    let mut table = load_with_spinner(file)?;
    if table.kind() != FileKind::Dbc {
        bail!("set-string only applies to DBC files");
    }
    if !table.update_string(index, value) {
        bail!("string index {} out of range", index);
    }
    table.save(output.as_deref())?;
    println!("String [{}] set to {:?}", index, value);
    Ok(())
}

/// Parse a decimal or 0x-prefixed hex value, as the original editor accepted.
fn parse_value(text: &str) -> Result<u64> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).with_context(|| format!("invalid hex value: {}", text))
    } else {
        text.parse()
            .with_context(|| format!("invalid decimal value: {}", text))
    }
}

/// Large values render as hex, matching the original viewer's display rule.
fn format_value(value: u64) -> String {
    if value > 1_000_000_000 {
        format!("0x{:X}", value)
    } else {
        value.to_string()
    }
}

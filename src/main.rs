use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use sycophant::proc::maps::{Enumerator, MapEntry, ProcfsSource};
use sycophant::{Pid, Target};

/// Print the virtual memory maps of a process
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// PID of the process to inspect. Defaults to this process.
    #[arg(short, long)]
    pid: Option<Pid>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Where procfs is mounted
    #[arg(long, default_value = "/proc")]
    procfs: PathBuf,

    /// Only print the mapping containing this hex address
    #[arg(long, value_parser = parse_address)]
    contains: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Raw,
    Json,
}

fn parse_address(s: &str) -> Result<usize, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    usize::from_str_radix(digits, 16).map_err(|_| format!("Invalid address: {}", s))
}

fn do_main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let target = Target::from(args.pid);
    let enumerator = Enumerator::new(ProcfsSource::with_root(&args.procfs));
    let maps = enumerator
        .all(target)
        .with_context(|| format!("couldn't read memory maps of process {}", target))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut entries = Vec::new();
    for entry in maps {
        let entry =
            entry.with_context(|| format!("couldn't parse memory maps of process {}", target))?;
        if let Some(addr) = args.contains {
            if !entry.contains(addr) {
                continue;
            }
        }
        match args.format {
            Format::Text => write_entry(&mut out, &entry)?,
            Format::Raw => writeln!(out, "{}", entry)?,
            Format::Json => entries.push(entry),
        }
    }
    if args.format == Format::Json {
        serde_json::to_writer_pretty(&mut out, &entries)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_entry<W: Write>(out: &mut W, entry: &MapEntry) -> io::Result<()> {
    let name = match entry.path() {
        Some(path) if entry.is_backed() => path,
        _ => "ANONYMOUS",
    };
    writeln!(out, "Mapping: {}", name)?;
    writeln!(out, "  Range: {:016X}:{:016X}", entry.start(), entry.end())?;
    writeln!(out, "  Prot:  {}", entry.flags())
}

fn main() {
    if let Err(x) = do_main() {
        eprintln!("Error. Causes: ");
        for c in x.chain() {
            eprintln!("- {}", c);
        }
        std::process::exit(1);
    }
}

// CLI application
use anyhow::{anyhow, Result};
use clap::{Args, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use ppcir_core::{Endness, GuestArch};
use std::path::PathBuf;

mod commands;
mod config;
mod image;

use commands::{scan, translate_elf, translate_raw, Limits, TargetOverrides};
use image::ElfStart;

#[derive(Parser)]
#[command(name = "ppcir")]
#[command(about = "PowerPC instruction decoder and IR dumper")]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ArchArg {
    Ppc32,
    Ppc64,
}

#[derive(Clone, Copy, ValueEnum)]
enum EndianArg {
    Big,
    Little,
}

#[derive(Args)]
struct TargetArgs {
    /// Guest architecture
    #[arg(long, value_enum)]
    arch: Option<ArchArg>,

    /// Guest byte order
    #[arg(long, value_enum)]
    endian: Option<EndianArg>,

    /// JSON guest configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Warn about every instruction that fails to decode
    #[arg(long)]
    sigill_diag: bool,
}

impl TargetArgs {
    fn overrides(&self) -> TargetOverrides {
        TargetOverrides {
            config: self.config.clone(),
            arch: self.arch.map(|a| match a {
                ArchArg::Ppc32 => GuestArch::Ppc32,
                ArchArg::Ppc64 => GuestArch::Ppc64,
            }),
            endness: self.endian.map(|e| match e {
                EndianArg::Big => Endness::Big,
                EndianArg::Little => Endness::Little,
            }),
            sigill_diag: self.sigill_diag,
        }
    }
}

#[derive(Args)]
struct LimitArgs {
    /// Maximum number of blocks to decode
    #[arg(long, default_value_t = 16)]
    max_blocks: usize,

    /// Maximum number of instructions per block
    #[arg(long, default_value_t = 64)]
    max_insns: u32,
}

impl LimitArgs {
    fn limits(&self) -> Limits {
        Limits { max_blocks: self.max_blocks, max_insns: self.max_insns.max(1) }
    }
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Decode blocks from a raw code image and print their IR
    Translate {
        /// Path to the raw image
        file: PathBuf,

        /// Guest address of the first byte
        #[arg(long, value_parser = parse_addr, default_value = "0")]
        base: u64,

        /// Address to start decoding at (default: the base address)
        #[arg(long, value_parser = parse_addr)]
        entry: Option<u64>,

        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        limits: LimitArgs,
    },
    /// Decode blocks from a PowerPC ELF file and print their IR
    Elf {
        /// Path to the ELF file
        file: PathBuf,

        /// Start at this symbol
        #[arg(long, conflicts_with = "addr")]
        symbol: Option<String>,

        /// Start at this address
        #[arg(long, value_parser = parse_addr)]
        addr: Option<u64>,

        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        limits: LimitArgs,
    },
    /// Decode every aligned word of a raw image and report statistics
    Scan {
        /// Path to the raw image
        file: PathBuf,

        /// Guest address of the first byte
        #[arg(long, value_parser = parse_addr, default_value = "0")]
        base: u64,

        #[command(flatten)]
        target: TargetArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level: &str = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Commands::Translate { file, base, entry, target, limits } => {
            let pb = create_progress_bar("Decoding image...");
            translate_raw(&file, base, entry, &target.overrides(), limits.limits())?;
            pb.finish_with_message("Decoding complete");
        }
        Commands::Elf { file, symbol, addr, target, limits } => {
            let start = match (&symbol, addr) {
                (Some(name), _) => ElfStart::Symbol(name),
                (None, Some(a)) => ElfStart::Addr(a),
                (None, None) => ElfStart::Entry,
            };
            let pb = create_progress_bar("Decoding ELF file...");
            translate_elf(&file, start, &target.overrides(), limits.limits())?;
            pb.finish_with_message("Decoding complete");
        }
        Commands::Scan { file, base, target, json } => {
            scan(&file, base, &target.overrides(), json)?;
        }
    }

    Ok(())
}

/// Accept `0x`-prefixed hex or plain decimal.
fn parse_addr(s: &str) -> Result<u64> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| anyhow!("invalid address '{}': {}", s, e))
}

fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_addr() {
        assert_eq!(parse_addr("0x80003100").unwrap(), 0x8000_3100);
        assert_eq!(parse_addr("4096").unwrap(), 4096);
        assert!(parse_addr("0xZZ").is_err());
    }

    #[test]
    fn test_cli_shape() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

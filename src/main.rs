// SPDX-License-Identifier: MIT

use clap::{Parser, ValueEnum};
use nv_bios_inspect::acquisition::{FileSource, RomSource};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    rom_file: PathBuf,

    #[arg(short, long, value_enum, default_value_t = Output::Debug)]
    output: Output,

    /// Write the logical ROM bytes back out unmodified, no checksum fix-up.
    #[arg(long)]
    dump: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Output {
    Debug,
    Json,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default_filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let source = FileSource { path: &args.rom_file };
    let rom = match source.acquire() {
        Ok(rom) => rom,
        Err(e) => {
            eprintln!("failed to read ROM from {:?}: {}", args.rom_file, e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dump_path) = &args.dump {
        if let Err(e) = fs::write(dump_path, rom.logical_bytes()) {
            eprintln!("failed to write dump to {:?}: {}", dump_path, e);
            return ExitCode::FAILURE;
        }
    }

    let parsed = match nv_bios_inspect::parse(rom) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("failed to parse ROM: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match args.output {
        Output::Debug => println!("{:#?}", parsed),
        Output::Json => match serde_json::to_string_pretty(&parsed) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("failed to serialize parsed bios: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    ExitCode::SUCCESS
}

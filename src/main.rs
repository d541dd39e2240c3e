use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use sim86_core::Decode;
use sim86_i8086::{
    new_machine, I8086Cpu, I8086Decoder, RunConfig, SignFlagPolicy, DEFAULT_STEP_LIMIT,
};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SignFlag {
    /// Set for any non-zero result
    NonZero,
    /// Set from the result's top bit
    HighBit,
}

impl From<SignFlag> for SignFlagPolicy {
    fn from(flag: SignFlag) -> Self {
        match flag {
            SignFlag::NonZero => SignFlagPolicy::NonZero,
            SignFlag::HighBit => SignFlagPolicy::HighBit,
        }
    }
}

/// Disassemble (and optionally run) a raw 8086 machine-code image.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Raw machine-code bytes to decode
    binary: PathBuf,

    /// Execute the decoded program and print the final machine state
    #[arg(short, long)]
    exec: bool,

    /// Append each instruction's encoded length to the listing
    #[arg(long)]
    show_length: bool,

    /// Sign-extend byte immediates when the S bit is set
    #[arg(long)]
    sign_extend: bool,

    /// How the sign flag is derived from a result
    #[arg(long, value_enum, default_value_t = SignFlag::NonZero)]
    sign_flag: SignFlag,

    /// Give up after this many executed instructions
    #[arg(long, default_value_t = DEFAULT_STEP_LIMIT)]
    max_steps: usize,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Record spans as folded stacks for flamegraph tooling
    #[arg(long, value_name = "FILE")]
    flame: Option<PathBuf>,
}

fn level_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (flame_layer, _flame_guard) = match &args.flame {
        Some(path) => {
            let (layer, guard) = tracing_flame::FlameLayer::with_file(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    let stderr_format = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(level_filter(args.verbose));

    tracing_subscriber::registry()
        .with(flame_layer)
        .with(stderr_format)
        .init();

    tracing::info!("loading {}", args.binary.display());
    let bytes = fs::read(&args.binary)
        .with_context(|| format!("failed to read {}", args.binary.display()))?;

    let decoder = I8086Decoder::new().with_sign_extension(args.sign_extend);
    let program = decoder
        .decode(&bytes)
        .with_context(|| format!("failed to decode {}", args.binary.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for instruction in &program {
        if args.show_length {
            writeln!(out, "{} (len:{})", instruction, instruction.length)?;
        } else {
            writeln!(out, "{}", instruction)?;
        }
    }

    if args.exec {
        let config = RunConfig::new()
            .with_step_limit(args.max_steps)
            .with_sign_flag(args.sign_flag.into());
        let machine = I8086Cpu::new(config)
            .run(new_machine(), &program)
            .context("execution failed")?;
        writeln!(out)?;
        writeln!(out, "final state:")?;
        writeln!(out, "{}", machine)?;
    }
    Ok(())
}

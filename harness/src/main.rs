use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};

use asm_6502::assembler;
use asm_6502::constants::memory_range;
use asm_6502::emulator::Emulator;
use asm_6502::resolver;
use asm_6502::selfhost;

/// Exit status for assembler failures and comparison mismatches.
const EXIT_FAILURE: u8 = 1;
/// Exit status for emulator runtime errors (undefined opcode, cycle cap).
const EXIT_RUNTIME: u8 = 2;

#[derive(Parser)]
#[command(author, version, about, long_about = None, disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve friendly source into the punch form
    Resolve(ResolveArgs),
    /// Assemble resolved source into a raw binary image
    Assemble(AssembleArgs),
    /// Load raw images into the emulator and run to a halt
    Run(RunArgs),
    /// Build the self-hosting assembler both ways and verify equivalence
    Selfhost(SelfhostArgs),
}

#[derive(Parser)]
struct ResolveArgs {
    /// Friendly source file
    source: PathBuf,
    /// Where to write the resolved form; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser)]
struct AssembleArgs {
    /// Resolved source file
    source: PathBuf,
    /// Where to write the raw image; required unless --listing is given
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print (effective address, byte) pairs
    #[arg(long)]
    listing: bool,
}

#[derive(Parser)]
struct RunArgs {
    /// Load a file into memory: PATH@HHHH. Repeatable.
    #[arg(long = "load", value_name = "PATH@HHHH")]
    load: Vec<String>,
    /// Reset program counter, hex
    #[arg(long, value_name = "HHHH")]
    start: String,
    /// Halt when the program counter reaches this address or beyond, hex
    #[arg(long, value_name = "HHHH")]
    trap: Option<String>,
    /// Halt after this many executed instructions
    #[arg(long, value_name = "N")]
    max_cycles: Option<u64>,
    /// After the halt, write memory [LO..HI] to PATH: LO:HI:PATH. Repeatable.
    #[arg(long = "dump", value_name = "LO:HI:PATH")]
    dump: Vec<String>,
    /// After the halt, compare memory [LO..HI] to PATH: LO:HI:PATH. Repeatable.
    #[arg(long = "compare", value_name = "LO:HI:PATH")]
    compare: Vec<String>,
    /// Print one line per executed instruction
    #[arg(long)]
    trace: bool,
    /// Keep running through BRK instructions (take the IRQ/BRK vector)
    #[arg(long)]
    no_halt_on_brk: bool,
}

#[derive(Parser)]
struct SelfhostArgs {
    /// Write the verified image to this path
    #[arg(long)]
    dump: Option<PathBuf>,
}

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .expect("failed to initialize logging");

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Resolve(args) => resolve(args),
        Commands::Assemble(args) => assemble(args),
        Commands::Run(args) => run(args),
        Commands::Selfhost(args) => selfhost_command(args),
    };

    match result {
        Ok(code) => code,
        Err(message) => {
            error!("{message}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn resolve(args: ResolveArgs) -> Result<ExitCode, String> {
    let source = read_text(&args.source)?;
    let resolved = match resolver::resolve(&source) {
        Ok(resolved) => resolved,
        Err(error) => {
            eprintln!("{}", error.nice_message());
            return Err(error.to_string());
        }
    };
    match args.output {
        Some(path) => {
            fs::write(&path, &resolved).map_err(|e| format!("{}: {e}", path.display()))?;
            info!("wrote {} bytes to {}", resolved.len(), path.display());
        }
        None => print!("{resolved}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn assemble(args: AssembleArgs) -> Result<ExitCode, String> {
    let source = read_text(&args.source)?;
    let assembly = assembler::assemble(&source)?;

    if args.listing {
        print!("{}", assembly.render_listing());
    }
    if let Some(path) = &args.output {
        fs::write(path, assembly.image()).map_err(|e| format!("{}: {e}", path.display()))?;
        match assembly.origin() {
            Some(origin) => info!(
                "wrote {} bytes to {} (origin {:04X})",
                assembly.image().len(),
                path.display(),
                origin
            ),
            None => info!("wrote an empty image to {}", path.display()),
        }
    } else if !args.listing {
        return Err("nothing to do: pass --output or --listing".to_string());
    }
    Ok(ExitCode::SUCCESS)
}

fn run(args: RunArgs) -> Result<ExitCode, String> {
    let mut emulator = Emulator::new();

    for load in &args.load {
        let (path, address) = parse_load(load)?;
        let bytes = fs::read(&path).map_err(|e| format!("{}: {e}", path.display()))?;
        info!("loaded {} bytes at {:04X}", bytes.len(), address);
        emulator.load(address, &bytes);
    }

    emulator.reset(parse_hex_u16(&args.start)?);
    emulator.cpu.trap_base = match &args.trap {
        Some(trap) => Some(parse_hex_u16(trap)?),
        None => None,
    };
    emulator.cpu.max_ticks = args.max_cycles;
    emulator.cpu.halt_on_brk = !args.no_halt_on_brk;
    emulator.cpu.trace = args.trace;

    let halt = emulator.run();
    info!(
        "halted after {} instructions: {:?}",
        emulator.cpu.tick_count, halt
    );

    if halt.is_runtime_error() {
        eprintln!("registers: {}", emulator.registers());
        eprintln!("recent instructions:");
        for line in emulator.cpu.recent_trace() {
            eprintln!("  {line}");
        }
        return Ok(ExitCode::from(EXIT_RUNTIME));
    }

    for dump in &args.dump {
        let (min, max, path) = parse_region(dump)?;
        fs::write(&path, emulator.dump(min, max))
            .map_err(|e| format!("{}: {e}", path.display()))?;
        info!("dumped {:04X}..{:04X} to {}", min, max, path.display());
    }

    let mut mismatched = false;
    for compare in &args.compare {
        let (min, max, path) = parse_region(compare)?;
        let expected = fs::read(&path).map_err(|e| format!("{}: {e}", path.display()))?;
        let actual = emulator.dump(min, max);
        if actual == expected {
            info!("{:04X}..{:04X} matches {}", min, max, path.display());
        } else {
            error!("{:04X}..{:04X} does not match {}", min, max, path.display());
            mismatched = true;
        }
    }

    if mismatched {
        Ok(ExitCode::from(EXIT_FAILURE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn selfhost_command(args: SelfhostArgs) -> Result<ExitCode, String> {
    let resolved = selfhost::resolved_source()?;
    let reference = selfhost::reference_assembly()?;
    info!(
        "reference image: {} bytes at {:04X}",
        reference.image().len(),
        memory_range::OUTPUT.min
    );

    let emulator = selfhost::run_on_emulator(reference.image(), &resolved)?;
    info!(
        "self-hosted assembly finished after {} instructions",
        emulator.cpu.tick_count
    );

    let min = memory_range::OUTPUT.min;
    let limit = reference
        .limit()
        .ok_or_else(|| "the reference image is empty".to_string())?;
    if emulator.dump(min, limit) != reference.image() {
        error!("the self-hosted image differs from the reference image");
        return Ok(ExitCode::from(EXIT_FAILURE));
    }
    info!("both paths agree over {:04X}..{:04X}", min, limit);

    if let Some(path) = &args.dump {
        fs::write(path, reference.image()).map_err(|e| format!("{}: {e}", path.display()))?;
        info!("wrote the verified image to {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn read_text(path: &PathBuf) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))
}

fn parse_hex_u16(text: &str) -> Result<u16, String> {
    let digits = text
        .trim_start_matches("0x")
        .trim_start_matches('$');
    u16::from_str_radix(digits, 16).map_err(|_| format!("not a hex address: \"{text}\""))
}

/// PATH@HHHH
fn parse_load(text: &str) -> Result<(PathBuf, u16), String> {
    let (path, address) = text
        .rsplit_once('@')
        .ok_or_else(|| format!("expected PATH@HHHH, got \"{text}\""))?;
    Ok((PathBuf::from(path), parse_hex_u16(address)?))
}

/// LO:HI:PATH
fn parse_region(text: &str) -> Result<(u16, u16, PathBuf), String> {
    let mut parts = text.splitn(3, ':');
    let min = parts
        .next()
        .ok_or_else(|| format!("expected LO:HI:PATH, got \"{text}\""))?;
    let max = parts
        .next()
        .ok_or_else(|| format!("expected LO:HI:PATH, got \"{text}\""))?;
    let path = parts
        .next()
        .ok_or_else(|| format!("expected LO:HI:PATH, got \"{text}\""))?;
    let min = parse_hex_u16(min)?;
    let max = parse_hex_u16(max)?;
    if min > max {
        return Err(format!("empty region {min:04X}..{max:04X}"));
    }
    Ok((min, max, PathBuf::from(path)))
}

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use rvhart::harness::{self, HarnessError};
use rvhart::{Hart, Memory};

/// Runs hexadecimal RISC-V instruction words on a single hart and reports
/// the state after each of them.
#[derive(Parser, Debug)]
#[command(name = "rvhart", version, about)]
struct Cli {
    /// Program file with one hexadecimal instruction word per line
    #[arg(default_value = "instruction.bin")]
    program: PathBuf,

    /// Only print the final register state
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), HarnessError> {
    let program = harness::load_program(&cli.program)?;
    let mut hart = Hart::new();
    let mut memory = Memory::new();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.quiet {
        harness::run(&mut hart, &mut memory, &program, &mut io::sink())?;
        harness::dump_registers(&hart, &mut out)?;
    } else {
        harness::run(&mut hart, &mut memory, &program, &mut out)?;
    }
    out.flush()?;
    Ok(())
}

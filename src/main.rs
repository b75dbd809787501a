//! Register machine runner.
//!
//! Loads a program, checks it, and runs it against the given registers.
//!
//! # Usage
//! ```text
//! rap <program.rap> [OPTIONS]
//! ```
//!
//! # Options
//! - `-i, --input <pairs>`: Initial registers, e.g. `"a: 3, b: 4"`
//! - `-c, --check`: Check the program and print its listing without running it
//! - `-t, --trace`: Log every step before it executes
//! - `-s, --start <step>`: Start at `step` instead of the first instruction
//! - `-m, --max-steps <n>`: Stop after `n` executed instructions
//! - `-q, --quiet`: Only log warnings and errors
//!
//! Exit status is 0 on a halted run, 1 on a load, check or usage error,
//! and 2 when `--max-steps` interrupted the run.

use rap::machine::isa::{Instruction, Step};
use rap::machine::processing_unit::{Exit, ProcessingUnit, StepLimit, Trace};
use rap::machine::program::Program;
use rap::machine::registers::Registers;
use rap::utils::log::{self, Level};
use rap::{error, info, trace, warn};
use std::env;
use std::fs;
use std::ops::ControlFlow;
use std::process;

const USAGE: &str = "\
Register Machine

USAGE:
    {program} <program.rap> [OPTIONS]

ARGS:
    <program.rap>    Program source file to run

OPTIONS:
    -i, --input <pairs>     Initial registers, e.g. \"a: 3, b: 4\"
    -c, --check             Check the program and print its listing
    -t, --trace             Log every step before it executes
    -s, --start <step>      Start at <step> instead of the first instruction
    -m, --max-steps <n>     Stop after <n> executed instructions
    -q, --quiet             Only log warnings and errors
    -h, --help              Print this help message

EXAMPLES:
    # Add two numbers
    {program} programs/add.rap -i \"a: 2, b: 3\"

    # Watch a program that never halts, for a while
    {program} programs/forever.rap -i \"a: 1\" -t -m 20
";

/// Logs each step and optionally stops after a fixed number of them.
struct Runner {
    tracing: bool,
    limit: Option<StepLimit>,
}

impl Trace for Runner {
    fn before(
        &mut self,
        step: Step,
        instruction: &Instruction,
        registers: &Registers,
    ) -> ControlFlow<()> {
        if let Some(limit) = self.limit.as_mut() {
            limit.before(step, instruction, registers)?;
        }
        if self.tracing {
            trace!("step {step}: {} | {registers}", instruction.operation);
        }
        ControlFlow::Continue(())
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let input_path = &args[1];
    let mut registers = Registers::new();
    let mut check_only = false;
    let mut tracing = false;
    let mut start: Option<Step> = None;
    let mut max_steps: Option<u64> = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--input" | "-i") => {
                let value = option_value(&args, &mut i, k);
                registers = value.parse().unwrap_or_else(|e| {
                    error!("Invalid input: {e}");
                    process::exit(1);
                });
            }
            k @ ("--start" | "-s") => {
                let value = option_value(&args, &mut i, k);
                start = Some(value.parse().unwrap_or_else(|_| {
                    error!("Invalid start step: '{value}' is not an integer");
                    process::exit(1);
                }));
            }
            k @ ("--max-steps" | "-m") => {
                let value = option_value(&args, &mut i, k);
                max_steps = Some(value.parse().unwrap_or_else(|_| {
                    error!("Invalid step limit: '{value}' is not a non-negative integer");
                    process::exit(1);
                }));
            }
            "--check" | "-c" => {
                check_only = true;
                i += 1;
            }
            "--trace" | "-t" => {
                tracing = true;
                i += 1;
            }
            "--quiet" | "-q" => {
                log::set_level(Level::Warn);
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    if tracing {
        log::set_level(Level::Trace);
    }

    let source = fs::read_to_string(input_path).unwrap_or_else(|e| {
        error!("Cannot read {input_path}: {e}");
        process::exit(1);
    });

    let program: Program = match source.parse() {
        Ok(program) => program,
        Err(e) => {
            eprint!("{}", e.render(input_path, &source));
            process::exit(1);
        }
    };

    let errors = program.check();
    if !errors.is_empty() {
        for e in &errors {
            eprint!("{}", e.render(input_path, &source));
        }
        error!("{} error(s) in {input_path}", errors.len());
        process::exit(1);
    }

    if check_only {
        print!("{program}");
        info!("{input_path}: {} instruction(s), no errors", program.len());
        return;
    }

    if let Some(step) = start
        && !program.contains(step)
    {
        error!("Start step {step} is not defined in {input_path}");
        process::exit(1);
    }

    let mut unit = ProcessingUnit::with_registers(registers);
    let mut runner = Runner {
        tracing,
        limit: max_steps.map(StepLimit::new),
    };

    match unit.run_with(&program, start, Some(&mut runner)) {
        Exit::Empty => warn!("{input_path} contains no instructions"),
        Exit::Halted { step, executed } => {
            info!("Halted at step {step} after {executed} step(s)");
        }
        Exit::Interrupted { step, executed } => {
            warn!("Stopped before step {step} after {executed} step(s)");
            println!("{}", unit.registers());
            process::exit(2);
        }
    }

    println!("{}", unit.registers());
}

/// Returns the value following the option at `args[*i]`, advancing past both.
fn option_value<'a>(args: &'a [String], i: &mut usize, option: &str) -> &'a str {
    *i += 1;
    if *i >= args.len() {
        error!("{option} requires an argument");
        process::exit(1);
    }
    let value = &args[*i];
    *i += 1;
    value
}

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}

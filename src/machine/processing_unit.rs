//! Execution engine.
//!
//! A [`ProcessingUnit`] owns a register file and runs a [`Program`] by
//! following the chain of steps its instructions return, until one of them
//! halts. There is no built-in step limit: a program that loops forever runs
//! forever unless the caller installs a [`Trace`] that breaks out, such as
//! [`StepLimit`].

use crate::machine::isa::{Instruction, Step};
use crate::machine::program::Program;
use crate::machine::registers::Registers;
use std::ops::ControlFlow;

/// Per-step hook invoked by [`ProcessingUnit::run_with`].
pub trait Trace {
    /// Called before `instruction` executes. Returning `Break` stops the run
    /// without executing it.
    fn before(
        &mut self,
        step: Step,
        instruction: &Instruction,
        registers: &Registers,
    ) -> ControlFlow<()> {
        let _ = (step, instruction, registers);
        ControlFlow::Continue(())
    }

    /// Called after `instruction` executed; `next` is the step it continues at.
    fn after(
        &mut self,
        step: Step,
        instruction: &Instruction,
        registers: &Registers,
        next: Option<Step>,
    ) {
        let _ = (step, instruction, registers, next);
    }
}

/// [`Trace`] that calls a closure before every step.
pub struct BeforeEach<F>(F);

/// Wraps `hook` as a [`Trace`] that never interrupts the run.
pub fn before_each<F>(hook: F) -> BeforeEach<F>
where
    F: FnMut(Step, &Instruction, &Registers),
{
    BeforeEach(hook)
}

impl<F> Trace for BeforeEach<F>
where
    F: FnMut(Step, &Instruction, &Registers),
{
    fn before(
        &mut self,
        step: Step,
        instruction: &Instruction,
        registers: &Registers,
    ) -> ControlFlow<()> {
        (self.0)(step, instruction, registers);
        ControlFlow::Continue(())
    }
}

/// [`Trace`] that stops a run after a fixed number of executed instructions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StepLimit {
    remaining: u64,
}

impl StepLimit {
    pub fn new(limit: u64) -> Self {
        Self { remaining: limit }
    }
}

impl Trace for StepLimit {
    fn before(&mut self, _: Step, _: &Instruction, _: &Registers) -> ControlFlow<()> {
        if self.remaining == 0 {
            return ControlFlow::Break(());
        }
        self.remaining -= 1;
        ControlFlow::Continue(())
    }
}

/// How a run ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Exit {
    /// There was no step to start from.
    Empty,
    /// An instruction at `step` halted the machine.
    Halted { step: Step, executed: u64 },
    /// A [`Trace`] stopped the run before `step` executed.
    Interrupted { step: Step, executed: u64 },
}

/// Register machine that executes loaded programs.
#[derive(Clone, Debug, Default)]
pub struct ProcessingUnit {
    registers: Registers,
}

impl ProcessingUnit {
    /// Creates a unit whose registers all read as zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a unit with pre-seeded registers.
    pub fn with_registers(registers: Registers) -> Self {
        Self { registers }
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn into_registers(self) -> Registers {
        self.registers
    }

    /// Runs `program` from its start step until it halts.
    ///
    /// # Panics
    ///
    /// Panics if execution reaches a step the program does not define, which
    /// cannot happen once [`Program::check`] came back empty.
    pub fn run(&mut self, program: &Program) {
        self.run_with(program, None, None);
    }

    /// Runs `program` from `step` instead of its start step.
    ///
    /// # Panics
    ///
    /// Same contract as [`ProcessingUnit::run`].
    pub fn run_from(&mut self, program: &Program, step: Step) {
        self.run_with(program, Some(step), None);
    }

    /// Runs `program` from `start` (default: the program's start step),
    /// reporting every step to `trace`.
    ///
    /// # Panics
    ///
    /// Same contract as [`ProcessingUnit::run`].
    pub fn run_with(
        &mut self,
        program: &Program,
        start: Option<Step>,
        mut trace: Option<&mut dyn Trace>,
    ) -> Exit {
        let Some(mut step) = start.or(program.start()) else {
            return Exit::Empty;
        };
        let mut executed = 0u64;

        loop {
            let instruction = program.get(step).unwrap_or_else(|| {
                panic!("step {step} is not defined; run Program::check before executing")
            });

            if let Some(t) = trace.as_mut()
                && t.before(step, instruction, &self.registers).is_break()
            {
                return Exit::Interrupted { step, executed };
            }

            let next = instruction.run(&mut self.registers);
            executed += 1;

            if let Some(t) = trace.as_mut() {
                t.after(step, instruction, &self.registers, next);
            }

            match next {
                Some(next) => step = next,
                None => return Exit::Halted { step, executed },
            }
        }
    }
}

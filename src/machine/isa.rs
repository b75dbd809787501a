//! Instruction set definitions.
//!
//! The [`for_each_operation!`](crate::for_each_operation) macro holds the canonical
//! keyword table and invokes a callback macro for code generation, so the
//! operand layout is written down exactly once.
//!
//! This module generates:
//! - The [`Operation`] enum with one variant per keyword
//! - Keyword lookup, arity, operand rendering and jump-target listing
//!
//! See [`program`](super::program) for the keyword parser generated from the same table.
//!
//! # Instructions
//!
//! | keyword | operands | effect |
//! |---------|----------|--------|
//! | `inc` | `register go_to_step` | `register += 1`, continue at `go_to_step` |
//! | `deb` | `register go_to_step branch_to_step` | if `register` is 0 continue at `branch_to_step`, else `register -= 1` and continue at `go_to_step` |
//! | `end` | | halt |

use crate::machine::errors::{ErrorKind, ProgramError};
use crate::machine::program::Program;
use crate::machine::registers::Registers;
use std::fmt;

/// Address of one instruction within a program.
pub type Step = i64;

/// Invokes a callback macro with the complete instruction table.
///
/// Operand kinds are `Register` (alphanumeric name) and `Step` (integer step number).
#[macro_export]
macro_rules! for_each_operation {
    ($callback:ident) => {
        $callback! {
            /// INC register go_to_step ; register += 1 ; next = go_to_step
            Inc = "inc" => [register: Register, go_to_step: Step],
            /// DEB register go_to_step branch_to_step ; if register == 0 { next = branch_to_step } else { register -= 1 ; next = go_to_step }
            Deb = "deb" => [register: Register, go_to_step: Step, branch_to_step: Step],
            /// END ; halt
            End = "end" => [],
        }
    };
}

macro_rules! define_operations {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $keyword:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        /// One instruction's operation and operands.
        #[derive(Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Operation {
            $(
                $(#[$doc])*
                $name {
                    $( $field: define_operations!(@ty $kind) ),*
                },
            )*
        }

        impl Operation {
            /// Every keyword in the instruction table.
            pub const KEYWORDS: &'static [&'static str] = &[ $( $keyword ),* ];

            /// Returns the source keyword for this operation.
            pub const fn keyword(&self) -> &'static str {
                match self {
                    $( Operation::$name { .. } => $keyword, )*
                }
            }

            /// Returns the number of operands this operation takes.
            pub const fn arity(&self) -> usize {
                match self {
                    $(
                        Operation::$name { .. } => {
                            <[()]>::len(&[ $( define_operations!(@unit $field) ),* ])
                        }
                    )*
                }
            }

            /// Step operands with their names, in declaration order.
            pub fn targets(&self) -> Vec<(&'static str, Step)> {
                let mut out = Vec::new();
                match self {
                    $(
                        Operation::$name { $( $field ),* } => {
                            $( define_operations!(@target out, $kind, $field); )*
                        }
                    )*
                }
                out
            }

            fn write_operands(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(
                        Operation::$name { $( $field ),* } => {
                            $( write!(f, " {}", $field)?; )*
                        }
                    )*
                }
                Ok(())
            }
        }
    };

    // ---------- types ----------
    (@ty Register) => { String };
    (@ty Step)     => { Step };

    (@unit $x:ident) => { () };

    // ---------- targets ----------
    (@target $out:ident, Step, $v:ident) => {
        $out.push((stringify!($v), *$v));
    };

    (@target $out:ident, Register, $v:ident) => {
        let _ = $v;
    };
}

crate::for_each_operation!(define_operations);

impl Operation {
    /// Executes the operation against `registers`.
    ///
    /// Returns the step to continue at, or `None` when the machine halts.
    pub fn run(&self, registers: &mut Registers) -> Option<Step> {
        match self {
            Operation::Inc {
                register,
                go_to_step,
            } => {
                registers.increment(register);
                Some(*go_to_step)
            }
            Operation::Deb {
                register,
                go_to_step,
                branch_to_step,
            } => {
                if registers.decrement(register) {
                    Some(*go_to_step)
                } else {
                    Some(*branch_to_step)
                }
            }
            Operation::End {} => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())?;
        self.write_operands(f)
    }
}

/// An operation placed at a step of a loaded program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instruction {
    /// Resolved step number.
    pub step: Step,
    /// Source line the instruction was loaded from.
    pub line: Option<usize>,
    pub operation: Operation,
}

impl Instruction {
    pub fn new(step: Step, operation: Operation) -> Self {
        Self {
            step,
            line: None,
            operation,
        }
    }

    /// Executes the instruction; see [`Operation::run`].
    pub fn run(&self, registers: &mut Registers) -> Option<Step> {
        self.operation.run(registers)
    }

    /// Yields one [`ErrorKind::InvalidTarget`] per step operand missing from `program`.
    pub fn check<'a>(&'a self, program: &'a Program) -> impl Iterator<Item = ProgramError> + 'a {
        self.operation
            .targets()
            .into_iter()
            .filter(|(_, step)| !program.contains(*step))
            .map(|(argument, step)| {
                ProgramError::new(ErrorKind::InvalidTarget { argument, step }).on_line(self.line)
            })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operation.arity() == 0 {
            return write!(f, "{:<7} {}", self.step, self.operation.keyword());
        }
        write!(f, "{:<7} {:<7}", self.step, self.operation.keyword())?;
        self.operation.write_operands(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inc(register: &str, go_to_step: Step) -> Operation {
        Operation::Inc {
            register: register.into(),
            go_to_step,
        }
    }

    fn deb(register: &str, go_to_step: Step, branch_to_step: Step) -> Operation {
        Operation::Deb {
            register: register.into(),
            go_to_step,
            branch_to_step,
        }
    }

    #[test]
    fn keyword_table() {
        assert_eq!(Operation::KEYWORDS, &["inc", "deb", "end"]);
        assert_eq!(inc("a", 1).keyword(), "inc");
        assert_eq!(deb("a", 1, 2).keyword(), "deb");
        assert_eq!(Operation::End {}.keyword(), "end");
    }

    #[test]
    fn arity() {
        assert_eq!(inc("a", 1).arity(), 2);
        assert_eq!(deb("a", 1, 2).arity(), 3);
        assert_eq!(Operation::End {}.arity(), 0);
    }

    #[test]
    fn inc_adds_one_and_continues() {
        let mut registers: Registers = [("a", 4), ("b", 7)].into_iter().collect();
        assert_eq!(inc("a", 9).run(&mut registers), Some(9));
        assert_eq!(registers.get("a"), 5);
        assert_eq!(registers.get("b"), 7);

        assert_eq!(inc("fresh", 2).run(&mut registers), Some(2));
        assert_eq!(registers.get("fresh"), 1);
    }

    #[test]
    fn deb_branches_on_zero_without_mutation() {
        let mut registers = Registers::new();
        assert_eq!(deb("a", 1, 3).run(&mut registers), Some(3));
        assert_eq!(registers.get("a"), 0);
        assert!(registers.is_empty());
    }

    #[test]
    fn deb_decrements_and_continues() {
        let mut registers: Registers = [("a", 2)].into_iter().collect();
        assert_eq!(deb("a", 1, 3).run(&mut registers), Some(1));
        assert_eq!(registers.get("a"), 1);
        assert_eq!(deb("a", 1, 3).run(&mut registers), Some(1));
        assert_eq!(registers.get("a"), 0);
        assert_eq!(deb("a", 1, 3).run(&mut registers), Some(3));
    }

    #[test]
    fn end_halts_regardless_of_registers() {
        let mut registers: Registers = [("a", 0), ("b", 12)].into_iter().collect();
        let before = registers.clone();
        assert_eq!(Operation::End {}.run(&mut registers), None);
        assert_eq!(registers, before);
    }

    #[test]
    fn targets_in_declaration_order() {
        assert_eq!(inc("a", 4).targets(), vec![("go_to_step", 4)]);
        assert_eq!(
            deb("a", 1, 3).targets(),
            vec![("go_to_step", 1), ("branch_to_step", 3)]
        );
        assert!(Operation::End {}.targets().is_empty());
    }

    #[test]
    fn operation_display() {
        assert_eq!(deb("r1", 2, 5).to_string(), "deb r1 2 5");
        assert_eq!(Operation::End {}.to_string(), "end");
    }

    #[test]
    fn instruction_display_is_column_aligned() {
        assert_eq!(
            Instruction::new(1, inc("a", 2)).to_string(),
            "1       inc     a 2"
        );
        assert_eq!(
            Instruction::new(12, deb("b", 1, 3)).to_string(),
            "12      deb     b 1 3"
        );
        assert_eq!(
            Instruction::new(3, Operation::End {}).to_string(),
            "3       end"
        );
    }
}

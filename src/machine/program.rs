//! Program representation, loader and structural check.
//!
//! Uses [`for_each_operation!`](crate::for_each_operation) to generate
//! `parse_operation`, the keyword-to-[`Operation`] parser.
//!
//! # Syntax
//!
//! ```text
//! [step] keyword operand ...   # optional comment
//! ```
//!
//! - Keywords are lowercase (`inc`, `deb`, `end`)
//! - Operands are whitespace separated; register names are alphanumeric,
//!   step numbers are decimal integers
//! - `#` starts a comment that runs to the end of the line
//! - Blank and comment-only lines are ignored
//!
//! # Step numbering
//!
//! Every non-blank line bumps a running counter. A line without an explicit
//! step takes the counter's value. A line with one must not go below the
//! counter, and moves the counter up to it, so numbering may skip ahead but
//! never back:
//!
//! ```text
//! inc a 5      # step 1
//! 5 deb a 1 6  # step 5
//! end          # step 6
//! ```

use crate::for_each_operation;
use crate::machine::errors::{ErrorKind, ProgramError};
use crate::machine::isa::{Instruction, Operation, Step};
use crate::machine::registers::is_register_name;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

const COMMENT_CHAR: char = '#';

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    /// 1-based column in the line.
    offset: usize,
}

/// Splits a line into whitespace separated tokens, stopping at a comment.
fn tokenize(line: &str) -> Vec<Token<'_>> {
    let code = strip_comment(line);
    let mut out = Vec::with_capacity(4);
    let mut start: Option<usize> = None;

    for (i, c) in code.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                out.push(token(code, s, i));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(token(code, s, code.len()));
    }

    out
}

fn token(code: &str, start: usize, end: usize) -> Token<'_> {
    Token {
        text: &code[start..end],
        offset: code[..start].chars().count() + 1,
    }
}

fn strip_comment(line: &str) -> &str {
    line.split(COMMENT_CHAR).next().unwrap_or_default()
}

/// Parse a step operand.
fn parse_step(tok: &Token<'_>, argument: &'static str) -> Result<Step, ProgramError> {
    tok.text.parse::<Step>().map_err(|_| {
        ProgramError::new(ErrorKind::InvalidArgument {
            argument,
            requirement: "an integer",
            token: tok.text.to_string(),
        })
        .at_column(tok.offset)
    })
}

/// Parse a register operand.
fn parse_register(tok: &Token<'_>, argument: &'static str) -> Result<String, ProgramError> {
    if !is_register_name(tok.text) {
        return Err(ProgramError::new(ErrorKind::InvalidArgument {
            argument,
            requirement: "alphanumeric",
            token: tok.text.to_string(),
        })
        .at_column(tok.offset));
    }
    Ok(tok.text.to_string())
}

macro_rules! define_operation_parser {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $keyword:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        /// Parses a keyword and its operand tokens into an [`Operation`].
        fn parse_operation(
            keyword: &Token<'_>,
            operands: &[Token<'_>],
        ) -> Result<Operation, ProgramError> {
            match keyword.text {
                $(
                    $keyword => {
                        let [ $( $field ),* ] = operands else {
                            return Err(ProgramError::new(ErrorKind::WrongArgumentCount {
                                instruction: $keyword,
                                expected: define_operation_parser!(@count $( $field ),*),
                                actual: operands.len(),
                            })
                            .at_column(keyword.offset));
                        };
                        Ok(Operation::$name {
                            $( $field: define_operation_parser!(@parse $kind, $field)?, )*
                        })
                    }
                )*
                other => Err(ProgramError::new(ErrorKind::InvalidInstruction {
                    name: other.to_string(),
                })
                .at_column(keyword.offset)),
            }
        }
    };

    // ---------- counting ----------
    (@count $( $x:ident ),* ) => {
        <[()]>::len(&[ $( define_operation_parser!(@unit $x) ),* ])
    };

    (@unit $x:ident) => { () };

    // ---------- parsing ----------
    (@parse Register, $tok:ident) => {
        parse_register($tok, stringify!($tok))
    };

    (@parse Step, $tok:ident) => {
        parse_step($tok, stringify!($tok))
    };
}

for_each_operation!(define_operation_parser);

/// One parsed source line whose step number is not resolved yet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Statement {
    /// Explicit step number, when the line starts with one.
    pub step: Option<Step>,
    pub line: Option<usize>,
    /// 1-based column of the line's first token.
    pub column: usize,
    pub operation: Operation,
}

/// A loaded program: instructions keyed by step, in ascending step order.
///
/// Built once by [`Program::load`] and read-only afterwards.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Program {
    instructions: BTreeMap<Step, Instruction>,
    start: Option<Step>,
}

impl Program {
    /// Parses a single line: an optional leading step number, a keyword and
    /// its operands.
    pub fn load_line(line: &str, line_no: Option<usize>) -> Result<Statement, ProgramError> {
        let tokens = tokenize(line);
        let Some(first) = tokens.first() else {
            return Err(ProgramError::new(ErrorKind::ExpectedInstruction)
                .on_line(line_no)
                .at_column(1));
        };

        let (step, rest) = match first.text.parse::<Step>() {
            Ok(step) => (Some(step), &tokens[1..]),
            Err(_) => (None, &tokens[..]),
        };

        let Some((keyword, operands)) = rest.split_first() else {
            return Err(ProgramError::new(ErrorKind::ExpectedInstruction)
                .on_line(line_no)
                .at_column(first.offset));
        };

        let operation = parse_operation(keyword, operands).map_err(|e| e.on_line(line_no))?;

        Ok(Statement {
            step,
            line: line_no,
            column: first.offset,
            operation,
        })
    }

    /// Loads a program from source lines, failing on the first malformed line.
    ///
    /// Line numbers in errors are 1-based positions in `lines`. The returned
    /// program has not been checked; see [`Program::check`].
    pub fn load<I>(lines: I) -> Result<Self, ProgramError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut program = Program::default();
        let mut expected_step: Step = 0;

        for (index, line) in lines.into_iter().enumerate() {
            let line = line.as_ref();
            let line_no = Some(index + 1);
            if strip_comment(line).trim().is_empty() {
                continue;
            }

            expected_step = expected_step.checked_add(1).ok_or_else(|| {
                ProgramError::new(ErrorKind::StepOutOfRange {
                    previous: expected_step,
                })
                .on_line(line_no)
            })?;

            let statement = Self::load_line(line, line_no)?;

            if let Some(step) = statement.step {
                if step < expected_step {
                    return Err(ProgramError::new(ErrorKind::StepTooLow {
                        expected: expected_step,
                        actual: step,
                    })
                    .on_line(line_no)
                    .at_column(statement.column));
                }
                expected_step = step;
            }

            program.push(Instruction {
                step: expected_step,
                line: line_no,
                operation: statement.operation,
            });
        }

        Ok(program)
    }

    /// Reads and loads a program file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ProgramError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| {
            ProgramError::new(ErrorKind::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })?;
        source.parse()
    }

    fn push(&mut self, instruction: Instruction) {
        if self.start.is_none() {
            self.start = Some(instruction.step);
        }
        self.instructions.insert(instruction.step, instruction);
    }

    /// Returns every jump or branch to a step the program does not define.
    ///
    /// Errors come in program order; an empty result means the program is
    /// safe to run.
    pub fn check(&self) -> Vec<ProgramError> {
        self.instructions
            .values()
            .flat_map(|instruction| instruction.check(self))
            .collect()
    }

    /// Like [`Program::check`], but stops at the first error.
    pub fn validate(&self) -> Result<(), ProgramError> {
        match self
            .instructions
            .values()
            .find_map(|instruction| instruction.check(self).next())
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Step of the first loaded instruction, `None` for an empty program.
    pub fn start(&self) -> Option<Step> {
        self.start
    }

    pub fn get(&self, step: Step) -> Option<&Instruction> {
        self.instructions.get(&step)
    }

    pub fn contains(&self, step: Step) -> bool {
        self.instructions.contains_key(&step)
    }

    /// Instructions in ascending step order.
    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.values()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl FromStr for Program {
    type Err = ProgramError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Program::load(source.lines())
    }
}

/// Renders one aligned instruction per line; the output loads back into an
/// equivalent program.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in self.iter() {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(program: &Program) -> Vec<Step> {
        program.iter().map(|i| i.step).collect()
    }

    fn kind(source: &str) -> ErrorKind {
        source.parse::<Program>().unwrap_err().kind
    }

    #[test]
    fn tokenize_tracks_columns() {
        let tokens = tokenize("  12 inc\ta 3 # trailing");
        let texts: Vec<_> = tokens.iter().map(|t| (t.text, t.offset)).collect();
        assert_eq!(texts, vec![("12", 3), ("inc", 6), ("a", 10), ("3", 12)]);
        assert!(tokenize("   # only a comment").is_empty());
    }

    #[test]
    fn implicit_steps_count_instruction_lines() {
        let source = "
            # header comment

            inc a 2
            deb a 1 3   # loop

            end
        ";
        let program: Program = source.parse().unwrap();
        assert_eq!(steps(&program), vec![1, 2, 3]);
        assert_eq!(program.start(), Some(1));
        assert_eq!(program.get(2).unwrap().line, Some(5));
    }

    #[test]
    fn explicit_steps_allow_gaps() {
        let program: Program = "inc a 5\n5 deb a 1 6\nend\n20 end\nend".parse().unwrap();
        assert_eq!(steps(&program), vec![1, 5, 6, 20, 21]);
    }

    #[test]
    fn first_instruction_is_start() {
        let program: Program = "10 inc a 11\n11 end".parse().unwrap();
        assert_eq!(program.start(), Some(10));
        assert!(!program.contains(1));
    }

    #[test]
    fn empty_program() {
        let program: Program = "# nothing here\n\n".parse().unwrap();
        assert!(program.is_empty());
        assert_eq!(program.start(), None);
        assert!(program.check().is_empty());
        assert_eq!(program.to_string(), "");
    }

    #[test]
    fn step_too_low() {
        let err = "5 inc a 6\n2 end".parse::<Program>().unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::StepTooLow {
                expected: 6,
                actual: 2
            }
        );
        assert_eq!(err.line, Some(2));
        assert_eq!(err.to_string(), "expected step >= 6 (got 2) (on line 2)");
    }

    #[test]
    fn redeclaring_a_step_is_too_low() {
        assert_eq!(
            kind("inc a 2\n1 end"),
            ErrorKind::StepTooLow {
                expected: 2,
                actual: 1
            }
        );
        assert_eq!(
            kind("3 inc a 2\n3 end"),
            ErrorKind::StepTooLow {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn step_counter_overflow() {
        let source = format!("{} end\nend", Step::MAX);
        assert_eq!(
            kind(&source),
            ErrorKind::StepOutOfRange {
                previous: Step::MAX
            }
        );
    }

    #[test]
    fn expected_instruction_after_step() {
        let err = "inc a 2\n   7   # dangling".parse::<Program>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExpectedInstruction);
        assert_eq!((err.line, err.column), (Some(2), Some(4)));
    }

    #[test]
    fn invalid_instruction() {
        let err = "inc a 2\n2 dec a 1 3".parse::<Program>().unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::InvalidInstruction { name: "dec".into() }
        );
        assert_eq!((err.line, err.column), (Some(2), Some(3)));
        assert!(matches!(kind("INC a 2"), ErrorKind::InvalidInstruction { .. }));
    }

    #[test]
    fn wrong_argument_count() {
        assert_eq!(
            kind("inc a"),
            ErrorKind::WrongArgumentCount {
                instruction: "inc",
                expected: 2,
                actual: 1
            }
        );
        assert_eq!(
            kind("deb a 1 2 3"),
            ErrorKind::WrongArgumentCount {
                instruction: "deb",
                expected: 3,
                actual: 4
            }
        );
        assert_eq!(
            kind("end now"),
            ErrorKind::WrongArgumentCount {
                instruction: "end",
                expected: 0,
                actual: 1
            }
        );
    }

    #[test]
    fn invalid_arguments_name_the_operand() {
        let err = "deb a 1 x".parse::<Program>().unwrap_err();
        assert_eq!(err.kind.to_string(), "branch_to_step must be an integer");
        assert_eq!(err.column, Some(9));

        let err = "inc a_b 2".parse::<Program>().unwrap_err();
        assert_eq!(err.kind.to_string(), "register must be alphanumeric");
        assert_eq!(err.column, Some(5));

        assert_eq!(
            kind("inc a 1.5").to_string(),
            "go_to_step must be an integer"
        );
    }

    #[test]
    fn load_line_reports_explicit_step() {
        let statement = Program::load_line("  4 deb r1 5 9", Some(7)).unwrap();
        assert_eq!(statement.step, Some(4));
        assert_eq!(statement.line, Some(7));
        assert_eq!(statement.column, 3);
        assert_eq!(
            statement.operation,
            Operation::Deb {
                register: "r1".into(),
                go_to_step: 5,
                branch_to_step: 9
            }
        );

        let statement = Program::load_line("end", None).unwrap();
        assert_eq!(statement.step, None);
        assert_eq!(statement.operation, Operation::End {});
    }

    #[test]
    fn load_line_without_tokens() {
        let err = Program::load_line("   ", Some(3)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExpectedInstruction);
        assert_eq!(err.line, Some(3));
    }

    #[test]
    fn check_reports_each_dangling_target() {
        let program: Program = "inc a 9\ndeb a 7 8\ndeb a 1 4\nend".parse().unwrap();
        let errors = program.check();
        let found: Vec<_> = errors.iter().map(|e| (e.kind.to_string(), e.line)).collect();
        assert_eq!(
            found,
            vec![
                ("invalid go_to_step 9".to_string(), Some(1)),
                ("invalid go_to_step 7".to_string(), Some(2)),
                ("invalid branch_to_step 8".to_string(), Some(2)),
            ]
        );
        assert_eq!(program.validate(), Err(errors[0].clone()));
    }

    #[test]
    fn check_accepts_closed_program() {
        let program: Program = "1 deb a 2 3\n2 inc b 1\n3 end".parse().unwrap();
        assert!(program.check().is_empty());
        assert_eq!(program.validate(), Ok(()));
    }

    #[test]
    fn negative_targets_load_but_fail_check() {
        let program: Program = "inc a -1\nend".parse().unwrap();
        let errors = program.check();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].kind,
            ErrorKind::InvalidTarget {
                argument: "go_to_step",
                step: -1
            }
        );
    }

    #[test]
    fn display_round_trips() {
        let source = "
            # c = a * b
            10 deb a 11 50
            deb b 12 20   # inner loop
            inc c 13
            inc t 11
            20 deb t 21 10
            inc b 20
            50 end
        ";
        let program: Program = source.parse().unwrap();
        let rendered = program.to_string();
        assert!(rendered.starts_with("10      deb     a 11 50\n11      deb     b 12 20\n"));
        assert!(rendered.ends_with("50      end\n"));

        let reloaded: Program = rendered.parse().unwrap();
        let shape = |p: &Program| -> Vec<(Step, Operation)> {
            p.iter().map(|i| (i.step, i.operation.clone())).collect()
        };
        assert_eq!(shape(&reloaded), shape(&program));
        assert_eq!(reloaded.start(), program.start());
    }

    #[test]
    fn load_file_reads_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("add.rap");
        fs::write(&path, "deb a 2 3\ninc b 1\nend\n").unwrap();

        let program = Program::load_file(&path).unwrap();
        assert_eq!(program.len(), 3);
    }

    #[test]
    fn load_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = Program::load_file(dir.path().join("missing.rap")).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Io { .. }));
        assert_eq!(err.line, None);
    }
}

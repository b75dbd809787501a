use rap_derive::Error;
use std::fmt;

/// What went wrong with a program, independent of where.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ErrorKind {
    /// An operand failed its format constraint.
    #[error("{argument} must be {requirement}")]
    InvalidArgument {
        argument: &'static str,
        requirement: &'static str,
        token: String,
    },
    /// A known keyword was given the wrong number of operands.
    #[error("wrong number of arguments for {instruction} (expected {expected}, got {actual})")]
    WrongArgumentCount {
        instruction: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The keyword is not in the instruction table.
    #[error("invalid instruction {name:?}")]
    InvalidInstruction { name: String },
    /// An explicit step number with nothing after it.
    #[error("expected instruction")]
    ExpectedInstruction,
    /// An explicit step number below the running minimum.
    #[error("expected step >= {expected} (got {actual})")]
    StepTooLow { expected: i64, actual: i64 },
    /// The running step counter cannot advance past the previous step.
    #[error("no step number available after {previous}")]
    StepOutOfRange { previous: i64 },
    /// A jump or branch to a step the program does not define.
    #[error("invalid {argument} {step}")]
    InvalidTarget { argument: &'static str, step: i64 },
    /// The program file could not be read.
    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },
}

/// A load or check failure, located in the program source when possible.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProgramError {
    pub kind: ErrorKind,
    /// 1-based source line. `None` for errors not tied to a line.
    pub line: Option<usize>,
    /// 1-based column of the offending token.
    pub column: Option<usize>,
}

impl ProgramError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            line: None,
            column: None,
        }
    }

    /// Attaches a source line, keeping any line already recorded.
    pub fn on_line(mut self, line: Option<usize>) -> Self {
        self.line = self.line.or(line);
        self
    }

    pub fn at_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Formats a compiler-style diagnostic pointing into `source`.
    pub fn render(&self, file: &str, source: &str) -> String {
        use std::fmt::Write;

        let mut diag = String::new();
        let _ = writeln!(diag, "error: {}", self.kind);

        let Some(line) = self.line else {
            let _ = writeln!(diag, " --> {file}");
            return diag;
        };

        let column = self.column.unwrap_or(1);
        let _ = writeln!(diag, " --> {file}:{line}:{column}");

        if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
            let gutter = " ".repeat(line.to_string().len());
            let _ = writeln!(diag, "{gutter} |");
            let _ = writeln!(diag, "{line} | {}", raw_line.trim_end_matches('\r'));
            let _ = writeln!(diag, "{gutter} | {}^", " ".repeat(column.saturating_sub(1)));
        }

        diag
    }
}

impl From<ErrorKind> for ProgramError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (on line {line})", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for ProgramError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Errors parsing `name: value` register assignments.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum InputError {
    #[error("expected `name: value`, got {0:?}")]
    MalformedPair(String),
    #[error("register name {0:?} must be alphanumeric")]
    InvalidName(String),
    #[error("value for {register} must be a non-negative integer (got {value:?})")]
    InvalidValue { register: String, value: String },
}

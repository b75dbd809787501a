//! Named counter registers.
//!
//! Registers are created on first write. Reading a register that was never
//! written yields zero, so programs never have to declare their registers.

use crate::machine::errors::InputError;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Mapping from register name to a non-negative counter, with default-zero reads.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Registers {
    values: HashMap<String, u64>,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `name`, or 0 if it was never written.
    pub fn get(&self, name: &str) -> u64 {
        self.values.get(name).copied().unwrap_or(0)
    }

    pub fn set(&mut self, name: impl Into<String>, value: u64) {
        self.values.insert(name.into(), value);
    }

    /// Adds one to `name`, saturating at `u64::MAX`.
    pub fn increment(&mut self, name: &str) {
        match self.values.get_mut(name) {
            Some(value) => *value = value.saturating_add(1),
            None => {
                self.values.insert(name.to_string(), 1);
            }
        }
    }

    /// Subtracts one from `name` and returns `true`, or returns `false`
    /// without touching anything when `name` is zero.
    pub fn decrement(&mut self, name: &str) -> bool {
        match self.values.get_mut(name) {
            Some(value) if *value > 0 => {
                *value -= 1;
                true
            }
            _ => false,
        }
    }

    /// Registers that have been written, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Registers sorted by [`natural_cmp`] on their names.
    pub fn sorted(&self) -> Vec<(&str, u64)> {
        let mut pairs: Vec<_> = self.iter().collect();
        pairs.sort_by(|a, b| natural_cmp(a.0, b.0));
        pairs
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, u64)> for Registers {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        let mut registers = Registers::new();
        registers.extend(iter);
        registers
    }
}

impl<K: Into<String>> Extend<(K, u64)> for Registers {
    fn extend<I: IntoIterator<Item = (K, u64)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.set(name, value);
        }
    }
}

/// Renders `name: value` pairs in natural order, joined by `, `.
impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.sorted().into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

/// Parses comma separated `name: value` pairs, e.g. `"a: 3, b: 0"`.
///
/// Empty segments are skipped, so `""` and `"a: 1,"` are accepted.
impl FromStr for Registers {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut registers = Registers::new();

        for pair in s.split(',') {
            if pair.trim().is_empty() {
                continue;
            }
            let (name, value) = pair
                .split_once(':')
                .ok_or_else(|| InputError::MalformedPair(pair.trim().to_string()))?;
            let (name, value) = (name.trim(), value.trim());

            if !is_register_name(name) {
                return Err(InputError::InvalidName(name.to_string()));
            }
            if !value.bytes().all(|b| b.is_ascii_digit()) {
                return Err(InputError::InvalidValue {
                    register: name.to_string(),
                    value: value.to_string(),
                });
            }
            let value = value.parse::<u64>().map_err(|_| InputError::InvalidValue {
                register: name.to_string(),
                value: value.to_string(),
            })?;

            registers.set(name, value);
        }

        Ok(registers)
    }
}

/// Returns `true` for a non-empty ASCII alphanumeric name.
pub fn is_register_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Compares names treating runs of digits as numbers, so `r2 < r10`.
///
/// Names whose chunks compare equal (`r7` and `r07`) fall back to plain
/// string order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);

    loop {
        let ord = match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(Chunk::Digits(x)), Some(Chunk::Digits(y))) => cmp_digits(x, y),
            (Some(Chunk::Digits(_)), Some(Chunk::Text(_))) => Ordering::Less,
            (Some(Chunk::Text(_)), Some(Chunk::Digits(_))) => Ordering::Greater,
            (Some(Chunk::Text(x)), Some(Chunk::Text(y))) => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
enum Chunk<'a> {
    Text(&'a str),
    Digits(&'a str),
}

/// Splits a name into alternating runs of digits and non-digits.
fn chunks(s: &str) -> impl Iterator<Item = Chunk<'_>> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map_or(rest.len(), |(i, _)| i);
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(if digits {
            Chunk::Digits(head)
        } else {
            Chunk::Text(head)
        })
    })
}

/// Numeric comparison of two digit runs of any length.
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

//! Predicate algebra evaluated directly against fixed-width tables.

mod eval;
mod parse;
pub(crate) mod rows;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use ahash::{AHashMap, AHashSet};
use regex::bytes::Regex;

use crate::core::{ColumnType, FwError, is_missing, parse_f64, parse_i64};

pub use eval::EvalContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    /// Whether `value <op> operand` holds, given `value.cmp(operand)`.
    pub fn test(&self, ordering: Ordering) -> bool {
        match self {
            Op::Eq => ordering == Ordering::Equal,
            Op::Ne => ordering != Ordering::Equal,
            Op::Lt => ordering == Ordering::Less,
            Op::Le => ordering != Ordering::Greater,
            Op::Gt => ordering == Ordering::Greater,
            Op::Ge => ordering != Ordering::Less,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
        }
    }
}

impl FromStr for Op {
    type Err = FwError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Op::Eq),
            "!=" => Ok(Op::Ne),
            "<" => Ok(Op::Lt),
            "<=" => Ok(Op::Le),
            ">" => Ok(Op::Gt),
            ">=" => Ok(Op::Ge),
            other => Err(FwError::MalformedFilter(format!("unknown operator '{other}'"))),
        }
    }
}

/// Typed constant a value is compared against.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Str(Vec<u8>),
    Int(i64),
    Float(f64),
}

impl Operand {
    /// Parse a numeric constant, preferring an integer.
    pub fn numeric(raw: &str) -> Result<Self, FwError> {
        let raw = raw.trim();
        if let Some(i) = parse_i64(raw.as_bytes()) {
            return Ok(Operand::Int(i));
        }
        parse_f64(raw.as_bytes())
            .map(Operand::Float)
            .ok_or_else(|| FwError::NonNumericValue(raw.to_string()))
    }

    /// Parse a constant in the form a column of `column_type` needs.
    pub fn for_column(raw: &str, column_type: ColumnType) -> Result<Self, FwError> {
        if column_type.is_numeric() {
            Self::numeric(raw)
        } else {
            Ok(Operand::Str(raw.as_bytes().to_vec()))
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Operand::Str(_))
    }

    /// Order a stored value relative to this operand. Missing or
    /// unparseable values have no ordering.
    pub fn compare(&self, value: &[u8], column_type: ColumnType) -> Option<Ordering> {
        if is_missing(value) {
            return None;
        }
        match self {
            Operand::Str(s) => Some(value.cmp(s.as_slice())),
            Operand::Int(x) if column_type == ColumnType::Integer => {
                Some(parse_i64(value)?.cmp(x))
            }
            Operand::Int(x) => parse_f64(value)?.partial_cmp(&(*x as f64)),
            Operand::Float(x) => parse_f64(value)?.partial_cmp(x),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Str(s) => write!(f, "{}", String::from_utf8_lossy(s)),
            Operand::Int(i) => write!(f, "{i}"),
            Operand::Float(x) => write!(f, "{x}"),
        }
    }
}

/// What a leaf checks about a single value.
#[derive(Debug, Clone)]
pub enum Test {
    Compare { op: Op, operand: Operand },
    /// Inclusive on both ends.
    Range { low: Operand, high: Operand },
    Regex { pattern: Regex, negate: bool },
    StartsWith(Vec<u8>),
    EndsWith(Vec<u8>),
    In { values: AHashSet<Vec<u8>>, negate: bool },
}

/// A leaf filter: one test applied to one column.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub column: String,
    pub test: Test,
}

impl Predicate {
    /// Missing values never match, including under negated tests.
    pub fn matches(&self, value: &[u8], column_type: ColumnType) -> bool {
        if is_missing(value) {
            return false;
        }
        match &self.test {
            Test::Compare { op, operand } => operand
                .compare(value, column_type)
                .is_some_and(|o| op.test(o)),
            Test::Range { low, high } => {
                low.compare(value, column_type)
                    .is_some_and(|o| o != Ordering::Less)
                    && high
                        .compare(value, column_type)
                        .is_some_and(|o| o != Ordering::Greater)
            }
            Test::Regex { pattern, negate } => pattern.is_match(value) != *negate,
            Test::StartsWith(prefix) => value.starts_with(prefix),
            Test::EndsWith(suffix) => value.ends_with(suffix),
            Test::In { values, negate } => values.contains(value) != *negate,
        }
    }

    fn describe(&self) -> String {
        match &self.test {
            Test::Compare { op, operand } if operand.is_numeric() => {
                format!("numeric '{}'", op.symbol())
            }
            Test::Compare { op, .. } => format!("string '{}'", op.symbol()),
            Test::Range { low, .. } if low.is_numeric() => "numeric range".to_string(),
            Test::Range { .. } => "string range".to_string(),
            Test::Regex { .. } => "regex".to_string(),
            Test::StartsWith(_) => "prefix".to_string(),
            Test::EndsWith(_) => "suffix".to_string(),
            Test::In { .. } => "membership".to_string(),
        }
    }

    pub fn check_type(&self, column_type: ColumnType) -> Result<(), FwError> {
        let numeric = match &self.test {
            Test::Compare { operand, .. } => Some(operand.is_numeric()),
            Test::Range { low, .. } => Some(low.is_numeric()),
            Test::Regex { .. } | Test::StartsWith(_) | Test::EndsWith(_) | Test::In { .. } => None,
        };
        match numeric {
            Some(numeric) if numeric != column_type.is_numeric() => Err(FwError::TypeMismatch {
                column: self.column.clone(),
                filter: self.describe(),
                column_type: column_type.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Filter {
    /// Passes every row.
    All,
    Leaf(Predicate),
    /// The right side only sees rows that passed the left side.
    And(Box<Filter>, Box<Filter>),
    /// The right side only sees rows the left side rejected.
    Or(Box<Filter>, Box<Filter>),
}

impl Filter {
    fn leaf(column: &str, test: Test) -> Self {
        Filter::Leaf(Predicate {
            column: column.to_string(),
            test,
        })
    }

    pub fn compare(column: &str, op: Op, operand: Operand) -> Self {
        Self::leaf(column, Test::Compare { op, operand })
    }

    pub fn string(column: &str, op: Op, value: &str) -> Self {
        Self::compare(column, op, Operand::Str(value.as_bytes().to_vec()))
    }

    pub fn int(column: &str, op: Op, value: i64) -> Self {
        Self::compare(column, op, Operand::Int(value))
    }

    pub fn float(column: &str, op: Op, value: f64) -> Self {
        Self::compare(column, op, Operand::Float(value))
    }

    /// Numeric comparison against a textual constant.
    pub fn numeric(column: &str, op: Op, value: &str) -> Result<Self, FwError> {
        Ok(Self::compare(column, op, Operand::numeric(value)?))
    }

    pub fn range(column: &str, low: Operand, high: Operand) -> Result<Self, FwError> {
        if low.is_numeric() != high.is_numeric() {
            return Err(FwError::MalformedFilter(format!(
                "range bounds on '{column}' mix numeric and string values ({low}, {high})"
            )));
        }
        Ok(Self::leaf(column, Test::Range { low, high }))
    }

    pub fn regex(column: &str, pattern: &str, negate: bool) -> Result<Self, FwError> {
        Ok(Self::leaf(
            column,
            Test::Regex {
                pattern: Regex::new(pattern)?,
                negate,
            },
        ))
    }

    pub fn starts_with(column: &str, prefix: &str) -> Self {
        Self::leaf(column, Test::StartsWith(prefix.as_bytes().to_vec()))
    }

    pub fn ends_with(column: &str, suffix: &str) -> Self {
        Self::leaf(column, Test::EndsWith(suffix.as_bytes().to_vec()))
    }

    pub fn is_in<I, V>(column: &str, values: I, negate: bool) -> Self
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let values = values
            .into_iter()
            .map(|v| v.as_ref().as_bytes().to_vec())
            .collect();
        Self::leaf(column, Test::In { values, negate })
    }

    pub fn and(left: Filter, right: Filter) -> Self {
        Filter::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Filter, right: Filter) -> Self {
        Filter::Or(Box::new(left), Box::new(right))
    }

    /// Left-nested AND over two or more filters.
    pub fn all(filters: Vec<Filter>) -> Result<Self, FwError> {
        Self::fold(filters, "and", Filter::and)
    }

    /// Left-nested OR over two or more filters.
    pub fn any(filters: Vec<Filter>) -> Result<Self, FwError> {
        Self::fold(filters, "or", Filter::or)
    }

    fn fold(
        filters: Vec<Filter>,
        name: &str,
        combine: fn(Filter, Filter) -> Filter,
    ) -> Result<Self, FwError> {
        if filters.len() < 2 {
            return Err(FwError::MalformedFilter(format!(
                "{name} needs at least two filters, got {}",
                filters.len()
            )));
        }
        let mut iter = filters.into_iter();
        let first = iter.next().unwrap_or(Filter::All);
        Ok(iter.fold(first, combine))
    }

    /// Columns read by this filter, in first-use order without repeats.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Filter::All => {}
            Filter::Leaf(p) => {
                if !out.contains(&p.column.as_str()) {
                    out.push(&p.column);
                }
            }
            Filter::And(l, r) | Filter::Or(l, r) => {
                l.collect_columns(out);
                r.collect_columns(out);
            }
        }
    }

    /// Validate every leaf against the resolved column types before any scan.
    pub fn check_types(&self, types: &AHashMap<String, ColumnType>) -> Result<(), FwError> {
        match self {
            Filter::All => Ok(()),
            Filter::Leaf(p) => {
                let column_type = types
                    .get(&p.column)
                    .ok_or_else(|| FwError::ColumnNotFound(p.column.clone()))?;
                p.check_type(*column_type)
            }
            Filter::And(l, r) | Filter::Or(l, r) => {
                l.check_types(types)?;
                r.check_types(types)
            }
        }
    }
}

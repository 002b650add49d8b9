//! Textual conditions such as `FloatA >= 2.2` or `Ordinal in Low,High`.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::{ColumnType, FwError};

use super::{Filter, Op, Operand};

static CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<column>.+?)\s*(?P<op>==|!=|<=|>=|=~|!~|\^=|\$=|<|>|\s+!in\s+|\s+in\s+|\s+between\s+)\s*(?P<value>.*?)\s*$",
    )
    .expect("condition pattern is valid")
});

impl Filter {
    /// Parse one condition. Comparison constants take the type of the
    /// column, looked up through `column_type`.
    pub fn parse<F>(expr: &str, column_type: F) -> Result<Filter, FwError>
    where
        F: Fn(&str) -> Result<ColumnType, FwError>,
    {
        let caps = CONDITION
            .captures(expr)
            .ok_or_else(|| FwError::MalformedFilter(format!("cannot parse condition '{expr}'")))?;
        let column = &caps["column"];
        let value = &caps["value"];

        match caps["op"].trim() {
            "=~" => Filter::regex(column, value, false),
            "!~" => Filter::regex(column, value, true),
            "^=" => Ok(Filter::starts_with(column, value)),
            "$=" => Ok(Filter::ends_with(column, value)),
            "in" => Ok(Filter::is_in(column, value.split(',').map(str::trim), false)),
            "!in" => Ok(Filter::is_in(column, value.split(',').map(str::trim), true)),
            "between" => {
                let (low, high) = value.split_once(',').ok_or_else(|| {
                    FwError::MalformedFilter(format!("between needs 'low,high', got '{value}'"))
                })?;
                let kind = column_type(column)?;
                Filter::range(
                    column,
                    Operand::for_column(low.trim(), kind)?,
                    Operand::for_column(high.trim(), kind)?,
                )
            }
            op => {
                let op: Op = op.parse()?;
                let kind = column_type(column)?;
                Ok(Filter::compare(column, op, Operand::for_column(value, kind)?))
            }
        }
    }
}

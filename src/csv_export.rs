//! Writes flat records as CSV text for download.
//!
//! Values are written as is: fields are never quoted or escaped, so a value
//! containing a comma will shift the columns of its line.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;

use crate::{
    Error,
    expense::{Category, DATE_FORMAT, Expense},
};

/// An expense as it appears in an export, without its ID.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseRow {
    pub amount: String,
    pub category: Category,
    pub date: String,
}

impl From<&Expense> for ExpenseRow {
    fn from(expense: &Expense) -> Self {
        Self {
            amount: expense.amount.to_string(),
            category: expense.category,
            date: expense
                .date
                .and_then(|date| date.format(DATE_FORMAT).ok())
                .unwrap_or_default(),
        }
    }
}

/// Write `rows` as CSV text.
///
/// The first line holds the field names of the record type, then each record
/// follows on its own line. Lines are separated by `\n` with no newline after
/// the last record. No rows gives an empty string.
///
/// # Errors
/// Returns [Error::CsvError] if a record cannot be serialized as a flat row.
pub fn to_csv<T: Serialize>(rows: &[T]) -> Result<String, Error> {
    if rows.is_empty() {
        return Ok(String::new());
    }

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in rows {
        writer
            .serialize(row)
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;
    let mut text = String::from_utf8(bytes).map_err(|error| Error::CsvError(error.to_string()))?;

    if text.ends_with('\n') {
        text.pop();
    }

    Ok(text)
}

/// Write `expenses` as CSV text with the columns amount, category and date.
pub fn expenses_to_csv(expenses: &[Expense]) -> Result<String, Error> {
    let rows: Vec<ExpenseRow> = expenses.iter().map(ExpenseRow::from).collect();

    to_csv(&rows)
}

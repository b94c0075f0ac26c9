use std::{borrow::Cow, ops::Range, str::FromStr};

use context_error::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DtaSelectError, DtaSelectErrorKind},
    helper_functions::tab_fields,
    line::ReportLine,
};

/// The mapping of column names to column indices as defined by a header line of a report. The
/// names are kept exactly as they appear in the header.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ColumnSchema {
    columns: IndexMap<String, usize>,
}

impl ColumnSchema {
    /// Build the schema from a tab separated header line
    pub fn from_header(header: &str) -> Self {
        let mut schema = Self::default();
        schema.extend(header);
        schema
    }

    /// Add the columns from another header line, a name that is already known gets the index from the new line
    pub fn extend(&mut self, header: &str) {
        let header = header.trim_end_matches(['\r', '\n']);
        for (index, range) in tab_fields(header).into_iter().enumerate() {
            self.columns.insert(header[range].to_string(), index);
        }
    }

    /// Get the index of the column with this name
    pub fn index(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    /// Check if this column is defined
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// All columns in order of definition
    pub fn columns(&self) -> impl Iterator<Item = (&str, usize)> {
        self.columns.iter().map(|(name, index)| (name.as_str(), *index))
    }

    /// The number of defined columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if no columns are defined
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get a column that has to be present in both the schema and the line.
    /// # Errors
    /// When the column is not defined in this schema or the line has no field at its index.
    pub(crate) fn required<'a>(
        &self,
        line: &'a ReportLine,
        column: &'static str,
    ) -> Result<Field<'a>, DtaSelectError> {
        self.optional(line, column)?.ok_or_else(|| {
            BoxedError::new(
                DtaSelectErrorKind::MalformedLine,
                "Missing column",
                format!("The column '{column}' is required but was not defined in the header"),
                line.full_context().to_owned(),
            )
        })
    }

    /// Get a column that may be missing from the schema, a missing column gives `None`.
    /// # Errors
    /// When the column is defined in this schema but the line has no field at its index.
    pub(crate) fn optional<'a>(
        &self,
        line: &'a ReportLine,
        column: &'static str,
    ) -> Result<Option<Field<'a>>, DtaSelectError> {
        let Some(index) = self.index(column) else {
            return Ok(None);
        };
        line.field_range(index)
            .map(|location| {
                Some(Field {
                    line,
                    location,
                    column,
                })
            })
            .ok_or_else(|| {
                BoxedError::new(
                    DtaSelectErrorKind::MalformedLine,
                    "Missing field",
                    format!(
                        "The column '{column}' is defined at index {index} but this line only has {} fields",
                        line.number_of_fields()
                    ),
                    line.full_context().to_owned(),
                )
            })
    }
}

/// A single field in a body line
#[derive(Clone, Debug)]
pub(crate) struct Field<'a> {
    line: &'a ReportLine,
    location: Range<usize>,
    column: &'static str,
}

impl Field<'_> {
    /// Treat an empty or '-' field as missing
    pub(crate) fn or_empty(self) -> Option<Self> {
        let text = self.as_str().trim();
        if text.is_empty() || text == "-" {
            None
        } else {
            Some(self)
        }
    }

    pub(crate) fn trim_end_matches(mut self, pattern: &str) -> Self {
        let trimmed = self.as_str().trim_end().trim_end_matches(pattern);
        let dif = self.location.len() - trimmed.len();
        self.location = self.location.start..self.location.end - dif;
        self
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.line.line()[self.location.clone()]
    }

    pub(crate) fn get_string(self) -> String {
        self.as_str().trim().to_string()
    }

    pub(crate) fn context(&self) -> Context<'_> {
        self.line
            .range_context(self.location.clone(), Some(Cow::Borrowed(self.column)))
    }

    /// The start of this field in the full line
    pub(crate) const fn offset(&self) -> usize {
        self.location.start
    }

    pub(crate) const fn line(&self) -> &ReportLine {
        self.line
    }

    /// # Errors
    /// If the text is not a valid `T`.
    pub(crate) fn parse<T: FromStr>(
        self,
        base_error: (&'static str, &'static str),
    ) -> Result<T, DtaSelectError> {
        self.as_str().trim().parse().map_err(|_| {
            BoxedError::new(
                DtaSelectErrorKind::MalformedLine,
                base_error.0,
                base_error.1,
                self.context().to_owned(),
            )
        })
    }
}

/// Parse an optional column, a column missing from the schema or an empty field give `None`.
/// # Errors
/// When the field is missing from the line or is not a valid `T`.
pub(crate) fn parse_optional<T: FromStr>(
    schema: &ColumnSchema,
    line: &ReportLine,
    column: &'static str,
    base_error: (&'static str, &'static str),
) -> Result<Option<T>, DtaSelectError> {
    schema
        .optional(line, column)?
        .and_then(Field::or_empty)
        .map(|field| field.parse(base_error))
        .transpose()
}

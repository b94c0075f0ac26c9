use std::{borrow::Cow, ops::Range};

use context_error::Context;

use crate::helper_functions::{is_numeric, tab_fields};

/// A single tab separated line of a report, with the location of every field
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ReportLine {
    source: String,
    line_index: usize,
    line: String,
    fields: Vec<Range<usize>>,
}

impl ReportLine {
    /// Split the line on tabs, a trailing carriage return is stripped first
    pub(crate) fn new(source: &str, line_index: usize, line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        Self {
            source: source.to_string(),
            line_index,
            fields: tab_fields(&line),
            line,
        }
    }

    /// Get the full line
    pub(crate) fn line(&self) -> &str {
        &self.line
    }

    pub(crate) fn number_of_fields(&self) -> usize {
        self.fields.len()
    }

    /// Get the text of a field, `None` if the line does not have this many fields
    pub(crate) fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|range| &self.line[range.clone()])
    }

    pub(crate) fn field_range(&self, index: usize) -> Option<Range<usize>> {
        self.fields.get(index).cloned()
    }

    /// Get the context for the whole line
    pub(crate) fn full_context(&self) -> Context<'_> {
        Context::full_line(self.line_index as u32, &self.line).source(self.source.as_str())
    }

    /// Get the context for the specified range in the line
    pub(crate) fn range_context<'a>(
        &'a self,
        range: Range<usize>,
        comment: Option<Cow<'a, str>>,
    ) -> Context<'a> {
        Context::line_with_comment(
            Some(self.line_index as u32),
            &self.line,
            range.start,
            range.len(),
            comment,
        )
        .source(self.source.as_str())
    }
}

/// The two kinds of body rows in a report
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum RowKind {
    Protein,
    Psm,
}

impl RowKind {
    /// A protein row has a numeric spectrum count in its second field, a PSM row has text there
    pub(crate) fn classify(second_field: &str) -> Self {
        if is_numeric(second_field) {
            Self::Protein
        } else {
            Self::Psm
        }
    }
}

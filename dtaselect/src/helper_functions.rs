use std::{ops::Range, path::Path};

/// Helper function to check extensions in filenames
pub(crate) fn check_extension(filename: impl AsRef<Path>, extension: impl AsRef<Path>) -> bool {
    filename
        .as_ref()
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension.as_ref()))
}

/// Check if the text is a decimal number, this accepts the full float grammar including signs,
/// exponents, and the special values (inf, nan). Surrounding whitespace is ignored.
pub(crate) fn is_numeric(text: &str) -> bool {
    text.trim().parse::<f64>().is_ok()
}

/// Find the byte ranges of all tab separated fields in the line
pub(crate) fn tab_fields(line: &str) -> Vec<Range<usize>> {
    let mut fields = Vec::new();
    let mut start = 0;
    for (index, _) in line.match_indices('\t') {
        fields.push(start..index);
        start = index + 1;
    }
    fields.push(start..line.len());
    fields
}

/// Find the first and last occurrence of the given byte that is not enclosed in round brackets
pub(crate) fn outer_positions(text: &str, needle: u8) -> Option<(usize, usize)> {
    let mut depth: usize = 0;
    let mut first = None;
    let mut last = None;
    for (index, byte) in text.bytes().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b if b == needle && depth == 0 => {
                first.get_or_insert(index);
                last = Some(index);
            }
            _ => (),
        }
    }
    first.zip(last)
}

use std::{fmt::Display, ops::Range, str::FromStr};

use context_error::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DtaSelectError, DtaSelectErrorKind},
    helper_functions::outer_positions,
};

/// The flanking residue used when a sequence has no flanks
pub const NO_FLANK: char = '-';

/// A mass shift placed on a residue of a peptide
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Modification {
    /// The mass shift in Dalton
    pub mass_shift: f64,
    /// The 1-based position in the clean sequence, 0 means the residue preceding the sequence
    pub position: usize,
    /// The modified residue
    pub residue: char,
}

/// A peptide as written in a report, `K.AC(15.9949)DR.T`, parsed into the clean sequence, flanking
/// residues, and modifications.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PeptideSequence {
    raw: String,
    sequence: String,
    before: char,
    after: char,
    body: Range<usize>,
    modifications: Vec<Modification>,
}

impl PeptideSequence {
    /// Parse a raw peptide token.
    /// # Errors
    /// If a modification does not contain a valid mass shift.
    pub fn parse(raw: &str) -> Result<Self, DtaSelectError> {
        Self::parse_inner(raw).map_err(|(range, explanation)| {
            BoxedError::new(
                DtaSelectErrorKind::MalformedLine,
                "Invalid peptide sequence",
                explanation,
                Context::line(None, raw, range.start, range.len()).to_owned(),
            )
        })
    }

    /// Parse a raw token, on failure give back the range in the token that is invalid
    pub(crate) fn parse_inner(raw: &str) -> Result<Self, (Range<usize>, &'static str)> {
        let (before, body, after) = match outer_positions(raw, b'.') {
            Some((first, last)) if first == last => {
                (flank(&raw[..first]), first + 1..raw.len(), NO_FLANK)
            }
            Some((first, last)) => (
                flank(&raw[..first]),
                first + 1..last,
                flank(&raw[last + 1..]),
            ),
            None => (NO_FLANK, 0..raw.len(), NO_FLANK),
        };

        let mut sequence = String::with_capacity(body.len());
        let mut modifications: Vec<Modification> = Vec::new();
        let mut index = body.start;
        while let Some(open) = raw[index..body.end].find('(').map(|o| o + index) {
            let Some(close) = raw[open..body.end].find(')').map(|c| c + open) else {
                break;
            };
            let segment = &raw[index..open];
            sequence.push_str(segment);
            let residue = segment.chars().next_back().unwrap_or_else(|| {
                modifications
                    .last()
                    .map_or(before, |modification| modification.residue)
            });
            let mass_shift = raw[open + 1..close]
                .trim()
                .parse::<f64>()
                .map_err(|_| (open + 1..close, "The mass shift is not a valid number"))?;
            modifications.push(Modification {
                mass_shift,
                position: sequence.chars().count(),
                residue,
            });
            index = close + 1;
        }
        sequence.push_str(&raw[index..body.end]);

        Ok(Self {
            raw: raw.to_string(),
            sequence,
            before,
            after,
            body,
            modifications,
        })
    }

    /// The token exactly as it was read
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The sequence without flanks and modifications
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// The sequence without flanks but with the modifications still in place, `AC(15.9949)DR`
    pub fn with_modifications(&self) -> &str {
        &self.raw[self.body.clone()]
    }

    /// The residue preceding the peptide, [`NO_FLANK`] if unknown
    pub const fn before(&self) -> char {
        self.before
    }

    /// The residue following the peptide, [`NO_FLANK`] if unknown
    pub const fn after(&self) -> char {
        self.after
    }

    /// All modifications in order of occurrence
    pub fn modifications(&self) -> &[Modification] {
        &self.modifications
    }

    /// The number of residues
    pub fn len(&self) -> usize {
        self.sequence.chars().count()
    }

    /// Check if there are no residues
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

fn flank(text: &str) -> char {
    text.chars().next().unwrap_or(NO_FLANK)
}

impl FromStr for PeptideSequence {
    type Err = DtaSelectError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for PeptideSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[allow(clippy::missing_panics_doc, clippy::float_cmp)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_modification() {
        let peptide = PeptideSequence::parse("K.AC(15.9949)DR.T").unwrap();
        assert_eq!(peptide.sequence(), "ACDR");
        assert_eq!(peptide.before(), 'K');
        assert_eq!(peptide.after(), 'T');
        assert_eq!(peptide.with_modifications(), "AC(15.9949)DR");
        assert_eq!(
            peptide.modifications(),
            [Modification {
                mass_shift: 15.9949,
                position: 2,
                residue: 'C'
            }]
        );
    }

    #[test]
    fn unmodified() {
        let peptide = PeptideSequence::parse("K.PEPTIDE.R").unwrap();
        assert_eq!(peptide.sequence(), "PEPTIDE");
        assert_eq!(peptide.len(), 7);
        assert!(peptide.modifications().is_empty());
        assert_eq!(peptide.to_string(), "K.PEPTIDE.R");
    }

    #[test]
    fn modified_flank() {
        let peptide = PeptideSequence::parse("R.(42.0106)MEPTIDE.-").unwrap();
        assert_eq!(peptide.sequence(), "MEPTIDE");
        assert_eq!(peptide.after(), NO_FLANK);
        assert_eq!(peptide.modifications()[0].position, 0);
        assert_eq!(peptide.modifications()[0].residue, 'R');
        assert_eq!(peptide.modifications()[0].mass_shift, 42.0106);
    }

    #[test]
    fn consecutive_modifications() {
        let peptide = PeptideSequence::parse("K.S(79.9663)(-18.0106)TM(15.9949)K.L").unwrap();
        assert_eq!(peptide.sequence(), "STMK");
        let mods = peptide.modifications();
        assert_eq!(mods.len(), 3);
        assert_eq!((mods[0].position, mods[0].residue), (1, 'S'));
        assert_eq!((mods[1].position, mods[1].residue), (1, 'S'));
        assert_eq!(mods[1].mass_shift, -18.0106);
        assert_eq!((mods[2].position, mods[2].residue), (3, 'M'));
    }

    #[test]
    fn without_flanks() {
        let peptide = PeptideSequence::parse("AC(15.9949)DR").unwrap();
        assert_eq!(peptide.sequence(), "ACDR");
        assert_eq!(peptide.before(), NO_FLANK);
        assert_eq!(peptide.after(), NO_FLANK);
        assert_eq!(peptide.with_modifications(), "AC(15.9949)DR");
        assert_eq!(peptide.modifications()[0].position, 2);
    }

    #[test]
    fn single_dot() {
        let peptide = PeptideSequence::parse("K.PEPTIDE").unwrap();
        assert_eq!(peptide.before(), 'K');
        assert_eq!(peptide.sequence(), "PEPTIDE");
        assert_eq!(peptide.after(), NO_FLANK);
    }

    #[test]
    fn scientific_mass() {
        let peptide = PeptideSequence::parse("-.M(1.59949E1)K.-").unwrap();
        assert_eq!(peptide.before(), '-');
        assert_eq!(peptide.modifications()[0].mass_shift, 15.9949);
    }

    #[test]
    fn invalid_mass() {
        let error = PeptideSequence::parse("K.AC(oxidation)DR.T").unwrap_err();
        assert!(matches!(error.get_kind(), DtaSelectErrorKind::MalformedLine));
        assert_eq!(
            PeptideSequence::parse_inner("K.AC(oxidation)DR.T").unwrap_err().0,
            5..14
        );
    }
}

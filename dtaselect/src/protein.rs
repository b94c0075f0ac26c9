use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    accession::parse_accession,
    collaborators::IndexedProtein,
    column_schema::{ColumnSchema, Field, parse_optional},
    error::DtaSelectError,
    group::{GroupIndex, PsmIndex},
    line::ReportLine,
    settings::AccessionMode,
};

pub(crate) const LOCUS: &str = "Locus";
const SPECTRUM_COUNT: &str = "Spectrum Count";
const COVERAGE: &str = "Sequence Coverage";
const LENGTH: &str = "Length";
const MOLECULAR_WEIGHT: &str = "MolWt";
const ISOELECTRIC_POINT: &str = "pI";
const DESCRIPTION: &str = "Descriptive Name";
const NSAF: &str = "NSAF";
const EMPAI: &str = "EMPAI";

static NUMBER_ERROR: (&str, &str) = (
    "Invalid DTASelect protein line",
    "This column is not a number but it is required to be a number in a DTASelect protein line",
);

static GENE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bGN=(\S+)").unwrap());

macro_rules! merge_options {
    ($target:ident, $source:ident, $overwrite:expr; $($field:ident),+ $(,)?) => {
        $(
            if $source.$field.is_some() && ($overwrite || $target.$field.is_none()) {
                $target.$field = $source.$field;
            }
        )+
    };
}

/// A protein from a report
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Protein {
    pub(crate) accession: String,
    /// The locus as written in the report (or the accession from the sequence index)
    pub locus: String,
    /// The descriptive name
    pub description: Option<String>,
    /// The gene name, taken from the `GN=` tag in the description
    pub gene: Option<String>,
    /// The number of residues
    pub length: Option<usize>,
    /// The molecular weight
    pub molecular_weight: Option<f64>,
    /// The isoelectric point
    pub isoelectric_point: Option<f64>,
    /// The sequence coverage in percent
    pub sequence_coverage: Option<f64>,
    /// The number of spectra identifying this protein
    pub spectrum_count: Option<usize>,
    /// The normalised spectral abundance factor
    pub nsaf: Option<f64>,
    /// The spectrum count divided by the length
    pub nsaf_normalized: Option<f64>,
    /// The exponentially modified protein abundance index
    pub empai: Option<f64>,
    /// The search engine that identified this protein
    pub search_engine: Option<String>,
    pub(crate) psms: IndexSet<PsmIndex>,
    pub(crate) groups: IndexSet<GroupIndex>,
}

impl Protein {
    /// Build a protein from a body line.
    /// # Errors
    /// If the locus is missing or a numeric column is not a number.
    pub(crate) fn from_line(
        line: &ReportLine,
        schema: &ColumnSchema,
        accession_mode: AccessionMode,
    ) -> Result<Self, DtaSelectError> {
        let locus = schema.required(line, LOCUS)?.get_string();
        let description = schema
            .optional(line, DESCRIPTION)?
            .and_then(Field::or_empty)
            .map(Field::get_string);
        let spectrum_count = parse_optional(schema, line, SPECTRUM_COUNT, NUMBER_ERROR)?;
        let length = parse_optional(schema, line, LENGTH, NUMBER_ERROR)?;
        let sequence_coverage = schema
            .optional(line, COVERAGE)?
            .map(|field| field.trim_end_matches("%"))
            .and_then(Field::or_empty)
            .map(|field| field.parse(NUMBER_ERROR))
            .transpose()?;

        Ok(Self {
            accession: accession(&locus, accession_mode),
            gene: description.as_deref().and_then(gene_from_description),
            nsaf_normalized: nsaf_normalized(spectrum_count, length),
            locus,
            description,
            length,
            molecular_weight: parse_optional(schema, line, MOLECULAR_WEIGHT, NUMBER_ERROR)?,
            isoelectric_point: parse_optional(schema, line, ISOELECTRIC_POINT, NUMBER_ERROR)?,
            sequence_coverage,
            spectrum_count,
            nsaf: parse_optional(schema, line, NSAF, NUMBER_ERROR)?,
            empai: parse_optional(schema, line, EMPAI, NUMBER_ERROR)?,
            ..Self::default()
        })
    }

    /// Build a protein from a sequence index hit
    pub(crate) fn from_indexed(indexed: &IndexedProtein, accession_mode: AccessionMode) -> Self {
        Self {
            accession: accession(&indexed.accession, accession_mode),
            locus: indexed.accession.clone(),
            gene: indexed
                .description
                .as_deref()
                .and_then(gene_from_description),
            description: indexed.description.clone(),
            ..Self::default()
        }
    }

    /// The accession this protein is known under
    pub fn accession(&self) -> &str {
        &self.accession
    }

    /// The PSMs identifying this protein
    pub fn psms(&self) -> impl ExactSizeIterator<Item = PsmIndex> + '_ {
        self.psms.iter().copied()
    }

    /// The groups this protein is a member of
    pub fn groups(&self) -> impl ExactSizeIterator<Item = GroupIndex> + '_ {
        self.groups.iter().copied()
    }

    /// The emPAI as calculated from the sequence coverage: `10^(coverage / 100) - 1`
    pub fn empai_from_coverage(&self) -> Option<f64> {
        self.sequence_coverage
            .map(|coverage| 10.0_f64.powf(coverage / 100.0) - 1.0)
    }

    /// Update this protein with a newly read version of the same protein. All fields that are
    /// set in the new version replace the current values, the locus is always replaced. Group
    /// membership is left to the report.
    pub(crate) fn update_from(&mut self, other: Self) {
        self.locus = other.locus;
        merge_options!(self, other, true; description, gene, length, molecular_weight, isoelectric_point,
            sequence_coverage, spectrum_count, nsaf, nsaf_normalized, empai, search_engine);
        self.psms.extend(other.psms);
    }

    /// Absorb a duplicate of this protein, only fields that are not yet set are taken over
    pub(crate) fn fill_gaps_from(&mut self, other: Self) {
        merge_options!(self, other, false; description, gene, length, molecular_weight, isoelectric_point,
            sequence_coverage, spectrum_count, nsaf, nsaf_normalized, empai, search_engine);
        self.psms.extend(other.psms);
    }
}

fn accession(locus: &str, accession_mode: AccessionMode) -> String {
    match accession_mode {
        AccessionMode::Verbatim => locus.to_string(),
        AccessionMode::Parsed => parse_accession(locus).0,
    }
}

fn nsaf_normalized(spectrum_count: Option<usize>, length: Option<usize>) -> Option<f64> {
    match (spectrum_count, length) {
        (Some(count), Some(length)) if length != 0 => Some(count as f64 / length as f64),
        _ => None,
    }
}

/// Get the gene name from a FASTA style description (`... OS=Homo sapiens GN=ALB PE=1 SV=2`)
pub(crate) fn gene_from_description(description: &str) -> Option<String> {
    GENE.captures(description)
        .and_then(|captures| captures.get(1))
        .map(|gene| gene.as_str().to_string())
}

#[allow(clippy::missing_panics_doc, clippy::float_cmp)]
#[cfg(test)]
mod tests {
    use context_error::FullErrorContent;

    use super::*;
    use crate::error::DtaSelectErrorKind;

    const HEADER: &str = "Locus\tSpectrum Count\tSequence Count\tSequence Coverage\tLength\tMolWt\tpI\tValidation Status\tNSAF\tEMPAI\tDescriptive Name";

    #[test]
    fn full_line() {
        let schema = ColumnSchema::from_header(HEADER);
        let line = ReportLine::new(
            "test",
            10,
            "sp|P02768|ALBU_HUMAN\t12\t7\t15.3%\t609\t69367\t6.3\tU\t0.0043\t1.2\tSerum albumin OS=Homo sapiens GN=ALB PE=1 SV=2",
        );
        let protein = Protein::from_line(&line, &schema, AccessionMode::Verbatim).unwrap();
        assert_eq!(protein.accession(), "sp|P02768|ALBU_HUMAN");
        assert_eq!(protein.spectrum_count, Some(12));
        assert_eq!(protein.sequence_coverage, Some(15.3));
        assert_eq!(protein.length, Some(609));
        assert_eq!(protein.molecular_weight, Some(69367.0));
        assert_eq!(protein.isoelectric_point, Some(6.3));
        assert_eq!(protein.nsaf, Some(0.0043));
        assert_eq!(protein.empai, Some(1.2));
        assert_eq!(protein.gene.as_deref(), Some("ALB"));
        assert_eq!(protein.nsaf_normalized, Some(12.0 / 609.0));

        let parsed = Protein::from_line(&line, &schema, AccessionMode::Parsed).unwrap();
        assert_eq!(parsed.accession(), "P02768");
        assert_eq!(parsed.locus, "sp|P02768|ALBU_HUMAN");
    }

    #[test]
    fn optional_columns() {
        let schema = ColumnSchema::from_header("Locus\tSpectrum Count\tSequence Coverage\tDescriptive Name");
        let line = ReportLine::new("test", 3, "P12345\t3\t8.1%\tUncharacterized protein");
        let protein = Protein::from_line(&line, &schema, AccessionMode::Verbatim).unwrap();
        assert_eq!(protein.length, None);
        assert_eq!(protein.nsaf, None);
        assert_eq!(protein.nsaf_normalized, None);
        assert_eq!(protein.gene, None);
        assert!((protein.empai_from_coverage().unwrap() - 0.205_035_940_371_797_4).abs() < 1e-9);
    }

    #[test]
    fn malformed() {
        let schema = ColumnSchema::from_header("Locus\tSpectrum Count\tLength");
        let line = ReportLine::new("test", 3, "P12345\t3\tlong");
        let error = Protein::from_line(&line, &schema, AccessionMode::Verbatim).unwrap_err();
        assert!(matches!(error.get_kind(), DtaSelectErrorKind::MalformedLine));
        let line = ReportLine::new("test", 3, "P12345\t3");
        let error = Protein::from_line(&line, &schema, AccessionMode::Verbatim).unwrap_err();
        assert!(matches!(error.get_kind(), DtaSelectErrorKind::MalformedLine));
    }

    #[test]
    fn merging() {
        let mut existing = Protein {
            accession: "P1".to_string(),
            locus: "P1".to_string(),
            length: Some(100),
            spectrum_count: Some(2),
            ..Protein::default()
        };
        existing.psms.insert(PsmIndex(0));
        let mut incoming = Protein {
            accession: "P1".to_string(),
            locus: "sp|P1|NAME".to_string(),
            spectrum_count: Some(5),
            nsaf: Some(0.1),
            ..Protein::default()
        };
        incoming.psms.insert(PsmIndex(1));
        existing.update_from(incoming);
        assert_eq!(existing.locus, "sp|P1|NAME");
        assert_eq!(existing.length, Some(100));
        assert_eq!(existing.spectrum_count, Some(5));
        assert_eq!(existing.psms().collect::<Vec<_>>(), [PsmIndex(0), PsmIndex(1)]);

        let duplicate = Protein {
            accession: "P2".to_string(),
            spectrum_count: Some(9),
            empai: Some(0.5),
            ..Protein::default()
        };
        existing.fill_gaps_from(duplicate);
        assert_eq!(existing.accession(), "P1");
        assert_eq!(existing.spectrum_count, Some(5));
        assert_eq!(existing.empai, Some(0.5));
    }

    #[test]
    fn indexed() {
        let protein = Protein::from_indexed(
            &IndexedProtein::new(
                "sp|P02768|ALBU_HUMAN",
                Some("Serum albumin OS=Homo sapiens GN=ALB".to_string()),
            ),
            AccessionMode::Parsed,
        );
        assert_eq!(protein.accession(), "P02768");
        assert_eq!(protein.gene.as_deref(), Some("ALB"));
        assert_eq!(protein.spectrum_count, None);
    }
}

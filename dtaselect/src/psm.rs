use std::borrow::Cow;

use context_error::*;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::{
    column_schema::{ColumnSchema, Field, parse_optional},
    error::{DtaSelectError, DtaSelectErrorKind},
    group::ProteinIndex,
    line::ReportLine,
    peptide_sequence::PeptideSequence,
};

pub(crate) const UNIQUE: &str = "Unique";
const FILE_NAME: &str = "FileName";
const XCORR: &str = "XCorr";
const DELTA_CN: &str = "DeltCN";
const CONFIDENCE: &str = "Conf%";
const EXPERIMENTAL_MH: &str = "M+H+";
const CALCULATED_MH: &str = "CalcM+H+";
const TOTAL_INTENSITY: &str = "TotalIntensity";
const SPR: &str = "SpR";
const PPM: &str = "PPM";
const ISOELECTRIC_POINT: &str = "pI";
const PROBABILITY_SCORE: &str = "Prob Score";
const PROBABILITY: &str = "Prob%";
const RETENTION_TIME: &str = "RT";
const ION_PROPORTION: &str = "IonProportion";
const REDUNDANCY: &str = "Redundancy";
const SEQUENCE: &str = "Sequence";

static NUMBER_ERROR: (&str, &str) = (
    "Invalid DTASelect PSM line",
    "This column is not a number but it is required to be a number in a DTASelect PSM line",
);

/// A peptide spectrum match from a report
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Psm {
    pub(crate) identifier: String,
    /// The `FileName` column as written, `run1.100.100.2`
    pub raw_identifier: String,
    /// The name of the raw file this spectrum is from
    pub raw_file_name: String,
    /// The scan number
    pub scan_number: String,
    /// The charge, this is stored even if the identifiers are not charge sensitive
    pub charge_state: Option<usize>,
    /// The peptide
    pub peptide: PeptideSequence,
    /// If this PSM is unique to its protein group (`*` in the `Unique` column)
    pub unique: bool,
    /// The SEQUEST XCorr
    pub xcorr: Option<f64>,
    /// The delta CN
    pub delta_cn: Option<f64>,
    /// The confidence in percent
    pub confidence: Option<f64>,
    /// The experimental M+H+
    pub experimental_mh: Option<f64>,
    /// The calculated M+H+
    pub calculated_mh: Option<f64>,
    /// The total intensity of the spectrum
    pub total_intensity: Option<f64>,
    /// The mass error in ppm
    pub mass_error_ppm: Option<f64>,
    /// The fraction of matched fragment ions
    pub ion_proportion: Option<f64>,
    /// The isoelectric point of the peptide
    pub isoelectric_point: Option<f64>,
    /// The probability in percent
    pub probability: Option<f64>,
    /// The probability score
    pub probability_score: Option<f64>,
    /// The number of times this spectrum is reported
    pub redundancy: Option<usize>,
    /// The rank of the preliminary score
    pub spr: Option<usize>,
    /// The retention time in minutes
    pub retention_time: Option<f64>,
    /// The run path of the report this PSM was read from
    pub run_path: String,
    /// The search engine that made this match
    pub search_engine: Option<String>,
    pub(crate) proteins: IndexSet<ProteinIndex>,
}

impl Psm {
    /// Build a PSM from a body line.
    /// # Errors
    /// If the file name or sequence is missing or invalid, or a numeric column is not a number.
    pub(crate) fn from_line(
        line: &ReportLine,
        schema: &ColumnSchema,
        run_path: &str,
        charge_sensitive: bool,
    ) -> Result<Self, DtaSelectError> {
        let raw_field = schema.required(line, FILE_NAME)?;
        let (raw_file_name, scan_number, charge_state) = split_raw_identifier(&raw_field)?;
        let peptide = parse_peptide(&schema.required(line, SEQUENCE)?)?;
        let unique = schema
            .optional(line, UNIQUE)?
            .is_some_and(|field| field.as_str().trim() == "*");

        Ok(Self {
            identifier: psm_identifier(
                &raw_file_name,
                &scan_number,
                peptide.with_modifications(),
                charge_state,
                charge_sensitive,
            ),
            raw_identifier: raw_field.get_string(),
            raw_file_name,
            scan_number,
            charge_state,
            peptide,
            unique,
            xcorr: parse_optional(schema, line, XCORR, NUMBER_ERROR)?,
            delta_cn: parse_optional(schema, line, DELTA_CN, NUMBER_ERROR)?,
            confidence: parse_optional(schema, line, CONFIDENCE, NUMBER_ERROR)?,
            experimental_mh: parse_optional(schema, line, EXPERIMENTAL_MH, NUMBER_ERROR)?,
            calculated_mh: parse_optional(schema, line, CALCULATED_MH, NUMBER_ERROR)?,
            total_intensity: parse_optional(schema, line, TOTAL_INTENSITY, NUMBER_ERROR)?,
            mass_error_ppm: parse_optional(schema, line, PPM, NUMBER_ERROR)?,
            ion_proportion: parse_optional(schema, line, ION_PROPORTION, NUMBER_ERROR)?,
            isoelectric_point: parse_optional(schema, line, ISOELECTRIC_POINT, NUMBER_ERROR)?,
            probability: parse_optional(schema, line, PROBABILITY, NUMBER_ERROR)?,
            probability_score: parse_optional(schema, line, PROBABILITY_SCORE, NUMBER_ERROR)?,
            redundancy: parse_optional(schema, line, REDUNDANCY, NUMBER_ERROR)?,
            spr: parse_optional(schema, line, SPR, NUMBER_ERROR)?,
            retention_time: parse_optional(schema, line, RETENTION_TIME, NUMBER_ERROR)?,
            run_path: run_path.to_string(),
            search_engine: None,
            proteins: IndexSet::new(),
        })
    }

    /// The identifier, `<raw file>-<scan>-<sequence with modifications>[-<charge>]`
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The full sequence as written, with flanks and modifications
    pub fn full_sequence(&self) -> &str {
        self.peptide.raw()
    }

    /// The proteins this PSM is assigned to
    pub fn proteins(&self) -> impl ExactSizeIterator<Item = ProteinIndex> + '_ {
        self.proteins.iter().copied()
    }
}

/// Split `run1.100.100.2` into the raw file name, scan number, and charge. The raw file name may
/// contain dots, the charge is the last segment and is left out if it is not a number.
fn split_raw_identifier(
    field: &Field<'_>,
) -> Result<(String, String, Option<usize>), DtaSelectError> {
    let text = field.as_str().trim();
    let parts: Vec<&str> = text.rsplitn(4, '.').collect();
    match parts.as_slice() {
        [charge, _, scan, file] => Ok((
            (*file).to_string(),
            (*scan).to_string(),
            charge.parse().ok(),
        )),
        _ => Err(BoxedError::new(
            DtaSelectErrorKind::MalformedLine,
            "Invalid DTASelect PSM line",
            "The file name should be formatted as 'file.scan.scan.charge'",
            field.context().to_owned(),
        )),
    }
}

fn parse_peptide(field: &Field<'_>) -> Result<PeptideSequence, DtaSelectError> {
    PeptideSequence::parse_inner(field.as_str().trim()).map_err(|(range, explanation)| {
        let start = field.offset() + field.as_str().len() - field.as_str().trim_start().len();
        BoxedError::new(
            DtaSelectErrorKind::MalformedLine,
            "Invalid peptide sequence",
            explanation,
            field
                .line()
                .range_context(
                    start + range.start..start + range.end,
                    Some(Cow::Borrowed(SEQUENCE)),
                )
                .to_owned(),
        )
    })
}

/// Build the identifier for a PSM, the charge is only included if the identifiers are charge sensitive
pub(crate) fn psm_identifier(
    raw_file_name: &str,
    scan_number: &str,
    sequence_with_modifications: &str,
    charge_state: Option<usize>,
    charge_sensitive: bool,
) -> String {
    match charge_state.filter(|_| charge_sensitive) {
        Some(charge) => {
            format!("{raw_file_name}-{scan_number}-{sequence_with_modifications}-{charge}")
        }
        None => format!("{raw_file_name}-{scan_number}-{sequence_with_modifications}"),
    }
}

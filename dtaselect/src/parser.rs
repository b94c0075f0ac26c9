use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use context_error::*;
use flate2::bufread::GzDecoder;
use regex::Regex;
use tracing::{debug, info, trace};

use crate::{
    collaborators::{AccessionAuthority, SequenceIndex},
    column_schema::ColumnSchema,
    error::{DtaSelectError, DtaSelectErrorKind},
    group::{ProteinGroup, PsmIndex},
    helper_functions::check_extension,
    line::{ReportLine, RowKind},
    parameters::CommandLineParameters,
    protein::{LOCUS, Protein},
    psm::{Psm, UNIQUE},
    report::DtaSelectReport,
    settings::ParserSettings,
};

/// The search engines that can be recognised, as `(lowercase prefix, name)`
const SEARCH_ENGINES: &[(&str, &str)] = &[("sequest", "Sequest"), ("prolucid", "ProLuCID")];
/// The engine assumed for a search engine line starting with '?'
const DEFAULT_SEARCH_ENGINE: &str = "ProLuCID";
const INTRO_MARKER: &str = "DTASelect";
const CONCLUSION_MARKER: &str = "Proteins";
const REMOVE_SUBSET_PROTEINS: &str = "Remove subset proteins";

/// The section of the report the parser is in
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ParserState {
    /// The first three lines
    Preamble,
    /// The search engine and parameter lines
    Header,
    Intro,
    Body,
    /// Everything after the summary line, ignored
    Conclusion,
}

impl std::fmt::Display for ParserState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Preamble => "preamble",
                Self::Header => "header",
                Self::Intro => "intro",
                Self::Body => "body",
                Self::Conclusion => "conclusion",
            }
        )
    }
}

/// The state of a single input, every input starts with fresh column schemas and an empty group
#[derive(Debug)]
struct InputState {
    name: String,
    directory: Option<PathBuf>,
    state: ParserState,
    run_path: String,
    search_engine_line: Option<usize>,
    protein_schema: ColumnSchema,
    psm_schema: ColumnSchema,
    current_group: ProteinGroup,
    last_row: Option<RowKind>,
}

impl InputState {
    fn new(name: &str, directory: Option<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            directory,
            state: ParserState::Preamble,
            run_path: String::new(),
            search_engine_line: None,
            protein_schema: ColumnSchema::default(),
            psm_schema: ColumnSchema::default(),
            current_group: ProteinGroup::default(),
            last_row: None,
        }
    }
}

/// A parser for DTASelect reports. Any number of reports can be read, these are all combined into a
/// single [`DtaSelectReport`] which is returned by [`Self::finish`].
/// ```
/// # use dtaselect::*;
/// # use std::io::BufReader;
/// let report = "DTASelect v2.1.4\n/data/run1\n/data/db.fasta\nProLuCID 1.4 in SQT format.\n -p 2 --trypstat\nDTASelect\nLocus\tSpectrum Count\tLength\tDescriptive Name\nUnique\tFileName\tXCorr\tSequence\nP12345\t1\t300\tSome protein GN=ABC\n*\trun1.100.100.2\t3.5\tK.PEPTIDE.R\n";
/// let parser = DtaSelectParser::new(ParserSettings::default()).unwrap();
/// let report = parser.parse_readers([("report", BufReader::new(report.as_bytes()))]).unwrap();
/// assert_eq!(report.protein("P12345").unwrap().psms().len(), 1);
/// ```
pub struct DtaSelectParser<'a> {
    settings: ParserSettings,
    decoy: Option<Regex>,
    sequence_index: Option<&'a dyn SequenceIndex>,
    authority: Option<&'a dyn AccessionAuthority>,
    report: DtaSelectReport,
}

impl std::fmt::Debug for DtaSelectParser<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DtaSelectParser")
            .field("settings", &self.settings)
            .field("sequence_index", &self.sequence_index.is_some())
            .field("authority", &self.authority.is_some())
            .field("report", &self.report)
            .finish()
    }
}

impl<'a> DtaSelectParser<'a> {
    /// Create a new parser.
    /// # Errors
    /// If the decoy pattern is not a valid regex or the batch size is zero.
    pub fn new(settings: ParserSettings) -> Result<Self, DtaSelectError> {
        let decoy = settings
            .decoy_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|error| {
                    BoxedError::new(
                        DtaSelectErrorKind::Settings,
                        "Invalid decoy pattern",
                        error.to_string(),
                        Context::show(pattern.to_string()),
                    )
                })
            })
            .transpose()?;
        if settings.batch_size == 0 {
            return Err(BoxedError::new(
                DtaSelectErrorKind::Settings,
                "Invalid batch size",
                "The batch size for accession lookups has to be at least 1",
                Context::none(),
            ));
        }
        Ok(Self {
            settings,
            decoy,
            sequence_index: None,
            authority: None,
            report: DtaSelectReport::default(),
        })
    }

    /// Use a sequence index to find the proteins for every PSM. This disables the protein groups
    /// based on the order of the report.
    #[must_use]
    pub fn with_sequence_index(mut self, index: &'a dyn SequenceIndex) -> Self {
        self.sequence_index = Some(index);
        self
    }

    /// Use an accession authority to merge proteins with the same canonical accession and to
    /// register aliases.
    #[must_use]
    pub fn with_accession_authority(mut self, authority: &'a dyn AccessionAuthority) -> Self {
        self.authority = Some(authority);
        self
    }

    /// The settings
    pub const fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// Read a report from a file, if the extension is `.gz` it is decompressed.
    /// # Errors
    /// If the file could not be opened or the report is invalid.
    pub fn read_file(&mut self, path: impl AsRef<Path>) -> Result<(), DtaSelectError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            BoxedError::new(
                DtaSelectErrorKind::Io,
                "Could not open file",
                e.to_string(),
                Context::none().source(path.to_string_lossy()).to_owned(),
            )
        })?;
        let name = path.to_string_lossy().to_string();
        let directory = path.parent().map(Path::to_path_buf);
        if check_extension(path, "gz") {
            self.read_input(
                &name,
                directory,
                BufReader::new(GzDecoder::new(BufReader::new(file))),
            )
        } else {
            self.read_input(&name, directory, BufReader::new(file))
        }
    }

    /// Read a report from any reader, the name is only used for error messages.
    /// # Errors
    /// If a line could not be read or the report is invalid.
    pub fn read(&mut self, name: &str, reader: impl BufRead) -> Result<(), DtaSelectError> {
        self.read_input(name, None, reader)
    }

    /// Read all files, in order, and finish the report.
    /// # Errors
    /// On the first input that fails, or if post processing fails.
    pub fn parse_files(
        mut self,
        paths: impl IntoIterator<Item = impl AsRef<Path>>,
    ) -> Result<DtaSelectReport, DtaSelectError> {
        for path in paths {
            self.read_file(path)?;
        }
        self.finish()
    }

    /// Read all named readers, in order, and finish the report.
    /// # Errors
    /// On the first input that fails, or if post processing fails.
    pub fn parse_readers(
        mut self,
        inputs: impl IntoIterator<Item = (impl AsRef<str>, impl BufRead)>,
    ) -> Result<DtaSelectReport, DtaSelectError> {
        for (name, reader) in inputs {
            self.read(name.as_ref(), reader)?;
        }
        self.finish()
    }

    /// Run the post processing and give back the report.
    /// # Errors
    /// If the accession authority fails.
    pub fn finish(mut self) -> Result<DtaSelectReport, DtaSelectError> {
        self.report.remove_orphan_psms();
        if let Some(authority) = self.authority {
            self.report
                .expand_aliases(authority, self.settings.batch_size)?;
            self.report
                .canonicalize(authority, self.settings.batch_size)?;
        }
        info!(
            proteins = self.report.number_of_proteins(),
            accessions = self.report.accessions().len(),
            peptides = self.report.sequences().len(),
            psms = self.report.number_of_psms(),
            inputs = self.report.metadata.inputs.len(),
            "Finished reading DTASelect reports"
        );
        Ok(self.report)
    }

    /// Read a single input, the reader is dropped before returning on both the success and failure path
    fn read_input(
        &mut self,
        name: &str,
        directory: Option<PathBuf>,
        reader: impl BufRead,
    ) -> Result<(), DtaSelectError> {
        info!(input = name, "Reading DTASelect report");
        let result = self.read_lines(InputState::new(name, directory), reader);
        trace!(input = name, "Released input");
        result
    }

    fn read_lines(
        &mut self,
        mut input: InputState,
        reader: impl BufRead,
    ) -> Result<(), DtaSelectError> {
        let decoys_before = self.report.metadata.decoys_discarded;
        for (line_index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| {
                BoxedError::new(
                    DtaSelectErrorKind::Io,
                    "Could not read line",
                    e.to_string(),
                    Context::none()
                        .source(input.name.as_str())
                        .line_index(line_index as u32)
                        .to_owned(),
                )
            })?;
            self.process_line(&mut input, line_index, &line)?;
        }
        if self.sequence_index.is_none() {
            let group = input.current_group.take();
            self.report.seal_group(group);
            info!(
                groups = self.report.number_of_groups(),
                input = %input.name,
                "Protein groups after reading input"
            );
        }
        info!(
            decoys = self.report.metadata.decoys_discarded - decoys_before,
            input = %input.name,
            "Discarded decoy proteins"
        );
        self.report.metadata.inputs.push(input.name);
        Ok(())
    }

    fn process_line(
        &mut self,
        input: &mut InputState,
        line_index: usize,
        text: &str,
    ) -> Result<(), DtaSelectError> {
        let text = text.trim_end_matches('\r');
        let metadata = &mut self.report.metadata;
        match line_index {
            0 => {
                metadata.format_version = text.split_whitespace().nth(1).map(ToString::to_string);
                return Ok(());
            }
            1 => {
                input.run_path = text.trim().to_string();
                metadata.run_path = Some(input.run_path.clone());
                return Ok(());
            }
            2 => {
                metadata.database_path = Some(text.trim().to_string());
                input.state = ParserState::Header;
                return Ok(());
            }
            _ => (),
        }
        if text.trim().is_empty() {
            return Ok(());
        }
        if input.state == ParserState::Conclusion {
            trace!(line = line_index + 1, state = %input.state, "Discarded line");
            return Ok(());
        }
        if text.starts_with(LOCUS) {
            input.protein_schema.extend(text);
            input.state = ParserState::Body;
            return Ok(());
        }
        if text.starts_with(UNIQUE) {
            input.psm_schema.extend(text);
            return Ok(());
        }
        if input.state != ParserState::Body {
            self.process_header_line(input, line_index, text);
            return Ok(());
        }

        let line = ReportLine::new(&input.name, line_index, text);
        let Some(second) = line.field(1) else {
            return Err(BoxedError::new(
                DtaSelectErrorKind::MalformedLine,
                "Invalid DTASelect line",
                "A line in the body of a report should contain at least two tab separated fields",
                line.full_context().to_owned(),
            ));
        };
        if second.trim() == CONCLUSION_MARKER {
            input.state = ParserState::Conclusion;
            return Ok(());
        }
        let kind = RowKind::classify(second);
        match kind {
            RowKind::Protein => self.protein_row(input, &line)?,
            RowKind::Psm => self.psm_row(input, &line)?,
        }
        input.last_row = Some(kind);
        Ok(())
    }

    /// Handle all lines between the preamble and the protein header
    fn process_header_line(&mut self, input: &mut InputState, line_index: usize, text: &str) {
        let metadata = &mut self.report.metadata;
        let lowercase = text.trim_start().to_ascii_lowercase();
        let engine = if lowercase.starts_with('?') {
            Some(DEFAULT_SEARCH_ENGINE)
        } else {
            SEARCH_ENGINES
                .iter()
                .find(|(prefix, _)| lowercase.starts_with(prefix))
                .map(|(_, name)| *name)
        };
        if let Some(engine) = engine {
            metadata.search_engines.insert(engine.to_string());
            metadata.search_engine_version = text.split_whitespace().nth(1).map(ToString::to_string);
            input.search_engine_line = Some(line_index);
            debug!(engine, version = ?metadata.search_engine_version, "Found search engine");
        } else if input.search_engine_line.is_some_and(|engine| engine + 1 == line_index) {
            metadata.parameter_lines.push(text.to_string());
            metadata.parameters = Some(CommandLineParameters::parse(text));
        } else if text.starts_with(INTRO_MARKER) {
            input.state = ParserState::Intro;
        } else if text.contains(REMOVE_SUBSET_PROTEINS) {
            metadata.remove_subset_proteins = text
                .split('\t')
                .next()
                .map(|flag| flag.trim().eq_ignore_ascii_case("true"));
        } else {
            trace!(line = line_index + 1, state = %input.state, "Discarded line");
        }
    }

    fn first_search_engine(&self) -> Option<String> {
        self.report.metadata.search_engines.first().cloned()
    }

    fn is_decoy(&self, accession: &str) -> bool {
        self.decoy
            .as_ref()
            .is_some_and(|decoy| decoy.is_match(accession))
    }

    fn protein_row(
        &mut self,
        input: &mut InputState,
        line: &ReportLine,
    ) -> Result<(), DtaSelectError> {
        if self.sequence_index.is_none() && input.last_row == Some(RowKind::Psm) {
            let group = input.current_group.take();
            self.report.seal_group(group);
        }
        let mut protein =
            Protein::from_line(line, &input.protein_schema, self.settings.accession_mode)?;
        if self.is_decoy(&protein.accession) || self.is_decoy(&protein.locus) {
            self.report.metadata.decoys_discarded += 1;
            trace!(accession = %protein.accession, "Discarded decoy protein");
            return Ok(());
        }
        protein.search_engine = self.first_search_engine();
        let index = self.report.insert_protein(protein);
        if self.sequence_index.is_none() {
            self.report.detach_from_groups(index);
            input.current_group.insert(index);
        }
        Ok(())
    }

    fn psm_row(&mut self, input: &InputState, line: &ReportLine) -> Result<(), DtaSelectError> {
        let mut psm = Psm::from_line(
            line,
            &input.psm_schema,
            &input.run_path,
            self.settings.charge_sensitive,
        )?;
        psm.search_engine = self.first_search_engine();
        let raw_file_name = psm.raw_file_name.clone();
        let sequence = psm.peptide.sequence().to_string();
        let (index, new) = self.report.insert_psm(psm);

        if new {
            let metadata = &mut self.report.metadata;
            if metadata.raw_file_names.insert(raw_file_name.clone()) {
                debug!(
                    raw_file = %raw_file_name,
                    total = metadata.raw_file_names.len(),
                    "Found new raw file"
                );
            }
            if let Some(directory) = &input.directory {
                metadata
                    .spectra_file_paths
                    .insert(directory.join(format!("{raw_file_name}.ms2")));
            }
            if let Some(sequence_index) = self.sequence_index {
                self.link_indexed_proteins(sequence_index, index, &sequence, line)?;
            }
        }

        if self.sequence_index.is_none() {
            for protein in input.current_group.members() {
                self.report.associate(*protein, index);
            }
        }
        Ok(())
    }

    fn link_indexed_proteins(
        &mut self,
        sequence_index: &dyn SequenceIndex,
        psm: PsmIndex,
        sequence: &str,
        line: &ReportLine,
    ) -> Result<(), DtaSelectError> {
        let hits = sequence_index.lookup(sequence)?;
        if hits.is_empty() && !self.settings.ignore_not_found {
            return Err(BoxedError::new(
                DtaSelectErrorKind::SequenceNotIndexed,
                "Peptide not found in the sequence index",
                format!(
                    "The peptide {sequence} is not found in the sequence index, review the indexing parameters such as the number of allowed missed cleavages"
                ),
                line.full_context().to_owned(),
            ));
        }
        debug!(peptide = sequence, proteins = hits.len(), "Looked up peptide");
        for hit in &hits {
            let protein = Protein::from_indexed(hit, self.settings.accession_mode);
            if self.is_decoy(&hit.accession) || self.is_decoy(&protein.accession) {
                self.report.metadata.decoys_discarded += 1;
                continue;
            }
            let protein = Protein {
                search_engine: self.first_search_engine(),
                ..protein
            };
            let index = self.report.get_or_insert_protein(protein);
            self.report.associate(index, psm);
        }
        Ok(())
    }
}

#[allow(clippy::missing_panics_doc)]
#[cfg(test)]
mod tests {
    use std::io::BufReader;

    use super::*;

    const REPORT: &str = "DTASelect v2.1.4
/data/run1
/data/db.fasta
Sequest v.28
-p 2 --trypstat
DTASelect
TRUE\tRemove subset proteins
Locus\tSpectrum Count\tSequence Coverage\tLength\tDescriptive Name
Unique\tFileName\tXCorr\tSequence
P12345\t1\t5.0%\t300\tSome protein
*\trun1.100.100.2\t3.5\tK.PEPTIDE.R

\tProteins\tPeptide IDs\tSpectra
Unfiltered\t1\t1\t1
";

    #[test]
    fn metadata() {
        let mut parser = DtaSelectParser::new(ParserSettings::default()).unwrap();
        parser
            .read("report", BufReader::new(REPORT.as_bytes()))
            .unwrap();
        let report = parser.finish().unwrap();
        let metadata = report.metadata();
        assert_eq!(metadata.format_version.as_deref(), Some("v2.1.4"));
        assert_eq!(metadata.run_path.as_deref(), Some("/data/run1"));
        assert_eq!(metadata.database_path.as_deref(), Some("/data/db.fasta"));
        assert_eq!(
            metadata.search_engines.iter().collect::<Vec<_>>(),
            ["Sequest"]
        );
        assert_eq!(metadata.search_engine_version.as_deref(), Some("v.28"));
        assert_eq!(metadata.parameter_lines, ["-p 2 --trypstat"]);
        assert_eq!(
            metadata.parameters.as_ref().unwrap().value("p"),
            Some(Some("2"))
        );
        assert_eq!(metadata.remove_subset_proteins, Some(true));
        assert_eq!(metadata.inputs, ["report"]);
        assert!(metadata.spectra_file_paths.is_empty());
        assert_eq!(
            report.protein("P12345").unwrap().search_engine.as_deref(),
            Some("Sequest")
        );
    }

    #[test]
    fn unknown_engine() {
        let text = REPORT.replace("Sequest v.28", "? 1.4");
        let report = DtaSelectParser::new(ParserSettings::default())
            .unwrap()
            .parse_readers([("report", BufReader::new(text.as_bytes()))])
            .unwrap();
        assert_eq!(
            report.metadata().search_engines.first().map(String::as_str),
            Some(DEFAULT_SEARCH_ENGINE)
        );
    }

    #[test]
    fn invalid_settings() {
        let error =
            DtaSelectParser::new(ParserSettings::default().with_decoy_pattern("Reverse_(")).unwrap_err();
        assert!(matches!(error.get_kind(), DtaSelectErrorKind::Settings));
        let error =
            DtaSelectParser::new(ParserSettings::default().with_batch_size(0)).unwrap_err();
        assert!(matches!(error.get_kind(), DtaSelectErrorKind::Settings));
    }

    #[test]
    fn single_field_body_line() {
        let text = REPORT.replace("\tProteins\tPeptide IDs\tSpectra", "garbage");
        let mut parser = DtaSelectParser::new(ParserSettings::default()).unwrap();
        let error = parser
            .read("report", BufReader::new(text.as_bytes()))
            .unwrap_err();
        assert!(matches!(error.get_kind(), DtaSelectErrorKind::MalformedLine));
    }
}

#![doc = include_str!("../README.md")]

mod accession;
mod collaborators;
mod column_schema;
mod error;
mod group;
mod helper_functions;
mod line;
mod parameters;
mod parser;
mod post_process;
mod peptide_sequence;
mod protein;
mod psm;
mod report;
mod settings;

pub use accession::{AccessionKind, accession_kind, parse_accession};
pub use collaborators::{AccessionAuthority, CanonicalAccession, IndexedProtein, SequenceIndex};
pub use column_schema::ColumnSchema;
pub use error::{DtaSelectError, DtaSelectErrorKind};
pub use group::{GroupIndex, ProteinGroup, ProteinIndex, PsmIndex};
pub use parameters::CommandLineParameters;
pub use parser::DtaSelectParser;
pub use peptide_sequence::{Modification, NO_FLANK, PeptideSequence};
pub use protein::Protein;
pub use psm::Psm;
pub use report::{DtaSelectReport, ReportMetadata};
pub use settings::{AccessionMode, ParserSettings};

/// A subset of the types and traits that are envisioned to be used the most, importing this is a good starting point for working with the crate
pub mod prelude {
    pub use crate::{
        AccessionAuthority, DtaSelectError, DtaSelectParser, DtaSelectReport, ParserSettings,
        Protein, Psm, SequenceIndex,
    };
}

//! The external services the parser can use: a sequence index to find the proteins for a peptide,
//! and an accession authority to resolve accessions to their canonical form.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    accession::{AccessionKind, accession_kind},
    error::DtaSelectError,
};

/// A protein as found in a sequence index
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct IndexedProtein {
    /// The accession
    pub accession: String,
    /// The description, normally the FASTA header without the accession
    pub description: Option<String>,
}

impl IndexedProtein {
    /// Create a new indexed protein
    pub fn new(accession: impl Into<String>, description: Option<String>) -> Self {
        Self {
            accession: accession.into(),
            description,
        }
    }
}

/// Find all proteins containing a peptide. When an index is used proteins are linked to PSMs
/// through this index instead of through their adjacency in the report.
pub trait SequenceIndex {
    /// Get all proteins that contain this (unmodified) peptide sequence.
    /// # Errors
    /// If the index could not be queried, this error is passed on unchanged.
    fn lookup(&self, peptide: &str) -> Result<Vec<IndexedProtein>, DtaSelectError>;
}

/// The canonical form of an accession together with all its known aliases
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct CanonicalAccession {
    /// The currently preferred accession
    pub canonical: String,
    /// Older or alternate accessions for the same protein
    pub aliases: Vec<String>,
}

impl CanonicalAccession {
    /// Create a new canonical accession
    pub fn new(canonical: impl Into<String>, aliases: impl IntoIterator<Item = String>) -> Self {
        Self {
            canonical: canonical.into(),
            aliases: aliases.into_iter().collect(),
        }
    }
}

/// Resolve accessions to their canonical form
pub trait AccessionAuthority {
    /// Resolve a batch of accessions. Accessions that are unknown to the authority can be left
    /// out of the returned map.
    /// # Errors
    /// If the authority could not be queried, this error is passed on unchanged.
    fn canonicalize(
        &self,
        accessions: &[String],
    ) -> Result<HashMap<String, CanonicalAccession>, DtaSelectError>;

    /// Check if an accession belongs to a legacy scheme for which the aliases should be
    /// registered. By default this is the IPI scheme.
    fn is_alternate_scheme(&self, accession: &str) -> bool {
        accession_kind(accession) == AccessionKind::Ipi
    }
}

impl<S: std::hash::BuildHasher> SequenceIndex for HashMap<String, Vec<IndexedProtein>, S> {
    fn lookup(&self, peptide: &str) -> Result<Vec<IndexedProtein>, DtaSelectError> {
        Ok(self.get(peptide).cloned().unwrap_or_default())
    }
}

impl<S: std::hash::BuildHasher> AccessionAuthority for HashMap<String, CanonicalAccession, S> {
    fn canonicalize(
        &self,
        accessions: &[String],
    ) -> Result<HashMap<String, CanonicalAccession>, DtaSelectError> {
        Ok(accessions
            .iter()
            .filter_map(|accession| {
                self.get(accession)
                    .map(|canonical| (accession.clone(), canonical.clone()))
            })
            .collect())
    }
}

#[allow(clippy::missing_panics_doc)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_index() {
        let index = HashMap::from([(
            "PEPTIDE".to_string(),
            vec![IndexedProtein::new("P12345", None)],
        )]);
        assert_eq!(index.lookup("PEPTIDE").unwrap().len(), 1);
        assert!(index.lookup("MISSING").unwrap().is_empty());
    }

    #[test]
    fn map_authority() {
        let authority = HashMap::from([(
            "IPI00000001.2".to_string(),
            CanonicalAccession::new("P12345", ["IPI00000001".to_string()]),
        )]);
        let resolved = authority
            .canonicalize(&["IPI00000001.2".to_string(), "Q99999".to_string()])
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved["IPI00000001.2"].canonical, "P12345");
        assert!(authority.is_alternate_scheme("IPI00000001.2"));
        assert!(!authority.is_alternate_scheme("P12345"));
    }
}

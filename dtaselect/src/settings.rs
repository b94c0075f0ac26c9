use serde::{Deserialize, Serialize};

/// How the accession of a protein is derived from the locus column
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum AccessionMode {
    /// The locus is used as is
    #[default]
    Verbatim,
    /// The accession is extracted from the locus, see [`crate::parse_accession`]
    Parsed,
}

/// All settings for reading reports
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct ParserSettings {
    /// Proteins with an accession (or locus) matching this regex are discarded as decoys
    pub decoy_pattern: Option<String>,
    /// Include the charge in the PSM identifier, if false PSMs differing only by charge are merged
    pub charge_sensitive: bool,
    /// Do not fail when the sequence index does not know the sequence of a PSM
    pub ignore_not_found: bool,
    /// How to get the accession from the locus
    pub accession_mode: AccessionMode,
    /// The maximal number of accessions sent to the accession authority in one call
    pub batch_size: usize,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            decoy_pattern: None,
            charge_sensitive: true,
            ignore_not_found: false,
            accession_mode: AccessionMode::default(),
            batch_size: 500,
        }
    }
}

impl ParserSettings {
    /// Set the decoy pattern
    #[must_use]
    pub fn with_decoy_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.decoy_pattern = Some(pattern.into());
        self
    }

    /// Set the charge sensitivity of the PSM identifiers
    #[must_use]
    pub const fn with_charge_sensitive(mut self, charge_sensitive: bool) -> Self {
        self.charge_sensitive = charge_sensitive;
        self
    }

    /// Set if missing sequences in the sequence index are ignored
    #[must_use]
    pub const fn with_ignore_not_found(mut self, ignore_not_found: bool) -> Self {
        self.ignore_not_found = ignore_not_found;
        self
    }

    /// Set the accession mode
    #[must_use]
    pub const fn with_accession_mode(mut self, accession_mode: AccessionMode) -> Self {
        self.accession_mode = accession_mode;
        self
    }

    /// Set the batch size for accession authority lookups
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

use std::{collections::HashMap, path::PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::{
    group::{GroupIndex, ProteinGroup, ProteinIndex, PsmIndex},
    parameters::CommandLineParameters,
    protein::Protein,
    psm::Psm,
};

/// Everything that is known about the reports that were read, apart from the proteins and PSMs
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ReportMetadata {
    /// The DTASelect version, the second token on the first line
    pub format_version: Option<String>,
    /// The run path, the second line
    pub run_path: Option<String>,
    /// The path to the database, the third line
    pub database_path: Option<String>,
    /// All search engines seen, in order of discovery
    pub search_engines: IndexSet<String>,
    /// The version of the last search engine line
    pub search_engine_version: Option<String>,
    /// The raw command line parameter line of every report
    pub parameter_lines: Vec<String>,
    /// The last parsed command line parameters
    pub parameters: Option<CommandLineParameters>,
    /// If DTASelect removed subset proteins
    pub remove_subset_proteins: Option<bool>,
    /// The number of proteins discarded because their accession matched the decoy pattern
    pub decoys_discarded: usize,
    /// All distinct raw file names of the PSMs
    pub raw_file_names: IndexSet<String>,
    /// The expected location of the spectra files, `<report directory>/<raw file name>.ms2`
    pub spectra_file_paths: IndexSet<PathBuf>,
    /// The names of all inputs in the order they were read
    pub inputs: Vec<String>,
}

/// The proteins, PSMs, and protein groups read from one or more DTASelect reports
#[derive(Clone, Debug, Default)]
pub struct DtaSelectReport {
    proteins: Vec<Option<Protein>>,
    psms: Vec<Option<Psm>>,
    groups: Vec<Option<ProteinGroup>>,
    group_lookup: HashMap<Vec<ProteinIndex>, GroupIndex>,
    pub(crate) protein_by_accession: IndexMap<String, ProteinIndex>,
    pub(crate) psm_by_identifier: IndexMap<String, PsmIndex>,
    pub(crate) psms_by_sequence: IndexMap<String, IndexSet<PsmIndex>>,
    pub(crate) metadata: ReportMetadata,
}

impl DtaSelectReport {
    /// Get the metadata
    pub const fn metadata(&self) -> &ReportMetadata {
        &self.metadata
    }

    /// Get the protein known under this accession, this includes aliases
    pub fn protein(&self, accession: &str) -> Option<&Protein> {
        self.protein_index(accession)
            .and_then(|index| self.protein_by_index(index))
    }

    /// Get the index of the protein known under this accession
    pub fn protein_index(&self, accession: &str) -> Option<ProteinIndex> {
        self.protein_by_accession.get(accession).copied()
    }

    /// Get a protein by index
    pub fn protein_by_index(&self, index: ProteinIndex) -> Option<&Protein> {
        self.proteins.get(index.0).and_then(Option::as_ref)
    }

    /// All distinct proteins
    pub fn proteins(&self) -> impl Iterator<Item = (ProteinIndex, &Protein)> {
        self.proteins
            .iter()
            .enumerate()
            .filter_map(|(index, protein)| protein.as_ref().map(|p| (ProteinIndex(index), p)))
    }

    /// The accession map, every accession (including aliases) with the protein it points to
    pub fn accessions(&self) -> impl ExactSizeIterator<Item = (&str, ProteinIndex)> {
        self.protein_by_accession
            .iter()
            .map(|(accession, index)| (accession.as_str(), *index))
    }

    /// The number of distinct proteins
    pub fn number_of_proteins(&self) -> usize {
        self.proteins.iter().flatten().count()
    }

    /// Get the PSM with this identifier
    pub fn psm(&self, identifier: &str) -> Option<&Psm> {
        self.psm_by_identifier
            .get(identifier)
            .and_then(|index| self.psm_by_index(*index))
    }

    /// Get a PSM by index
    pub fn psm_by_index(&self, index: PsmIndex) -> Option<&Psm> {
        self.psms.get(index.0).and_then(Option::as_ref)
    }

    /// All PSMs in order of first occurrence
    pub fn psms(&self) -> impl Iterator<Item = (PsmIndex, &Psm)> {
        self.psm_by_identifier
            .values()
            .filter_map(|index| self.psm_by_index(*index).map(|psm| (*index, psm)))
    }

    /// The number of PSMs
    pub fn number_of_psms(&self) -> usize {
        self.psm_by_identifier.len()
    }

    /// All full sequences (with flanks and modifications) that have at least one PSM
    pub fn sequences(&self) -> impl ExactSizeIterator<Item = &str> {
        self.psms_by_sequence.keys().map(String::as_str)
    }

    /// All PSMs for a full sequence, `K.AC(15.9949)DR.T`
    pub fn psms_for_sequence(&self, full_sequence: &str) -> impl Iterator<Item = &Psm> {
        self.psms_by_sequence
            .get(full_sequence)
            .into_iter()
            .flatten()
            .filter_map(|index| self.psm_by_index(*index))
    }

    /// All protein groups in the order they were read
    pub fn groups(&self) -> impl Iterator<Item = (GroupIndex, &ProteinGroup)> {
        self.groups
            .iter()
            .enumerate()
            .filter_map(|(index, group)| group.as_ref().map(|g| (GroupIndex(index), g)))
    }

    /// Get a protein group by index
    pub fn group(&self, index: GroupIndex) -> Option<&ProteinGroup> {
        self.groups.get(index.0).and_then(Option::as_ref)
    }

    /// The number of protein groups
    pub fn number_of_groups(&self) -> usize {
        self.groups.iter().flatten().count()
    }

    /// The distinct peptide sequences (without modifications) of all PSMs of a protein
    pub fn peptide_sequences(&self, protein: ProteinIndex) -> IndexSet<&str> {
        self.protein_by_index(protein)
            .into_iter()
            .flat_map(Protein::psms)
            .filter_map(|psm| self.psm_by_index(psm))
            .map(|psm| psm.peptide.sequence())
            .collect()
    }

    /// The other proteins in a group
    pub fn sibling_proteins(
        &self,
        protein: ProteinIndex,
        group: GroupIndex,
    ) -> impl Iterator<Item = &Protein> {
        self.group(group)
            .into_iter()
            .flat_map(ProteinGroup::members)
            .filter(move |member| **member != protein)
            .filter_map(|member| self.protein_by_index(*member))
    }

    pub(crate) fn protein_mut(&mut self, index: ProteinIndex) -> Option<&mut Protein> {
        self.proteins.get_mut(index.0).and_then(Option::as_mut)
    }

    pub(crate) fn psm_mut(&mut self, index: PsmIndex) -> Option<&mut Psm> {
        self.psms.get_mut(index.0).and_then(Option::as_mut)
    }

    /// Store a protein, if a protein with the same accession is known the new one is merged into it
    pub(crate) fn insert_protein(&mut self, protein: Protein) -> ProteinIndex {
        if let Some(index) = self.protein_index(&protein.accession) {
            if let Some(existing) = self.protein_mut(index) {
                existing.update_from(protein);
                return index;
            }
        }
        self.push_protein(protein)
    }

    /// Get the protein with the same accession, or store this one if it is unknown
    pub(crate) fn get_or_insert_protein(&mut self, protein: Protein) -> ProteinIndex {
        match self.protein_index(&protein.accession) {
            Some(index) if self.protein_by_index(index).is_some() => index,
            _ => self.push_protein(protein),
        }
    }

    fn push_protein(&mut self, protein: Protein) -> ProteinIndex {
        let index = ProteinIndex(self.proteins.len());
        self.protein_by_accession
            .insert(protein.accession.clone(), index);
        self.proteins.push(Some(protein));
        index
    }

    /// Store a PSM, if a PSM with the same identifier is known that one is returned instead, the
    /// boolean indicates if the PSM is new
    pub(crate) fn insert_psm(&mut self, psm: Psm) -> (PsmIndex, bool) {
        if let Some(index) = self.psm_by_identifier.get(&psm.identifier) {
            return (*index, false);
        }
        let index = PsmIndex(self.psms.len());
        self.psm_by_identifier.insert(psm.identifier.clone(), index);
        self.psms_by_sequence
            .entry(psm.full_sequence().to_string())
            .or_default()
            .insert(index);
        self.psms.push(Some(psm));
        (index, true)
    }

    /// Link a protein and a PSM in both directions
    pub(crate) fn associate(&mut self, protein: ProteinIndex, psm: PsmIndex) {
        if let Some(p) = self.protein_mut(protein) {
            p.psms.insert(psm);
        }
        if let Some(p) = self.psm_mut(psm) {
            p.proteins.insert(protein);
        }
    }

    /// Add a finished group, empty groups are ignored and a group with the exact same members as an
    /// earlier group is not stored twice
    pub(crate) fn seal_group(&mut self, group: ProteinGroup) -> Option<GroupIndex> {
        if group.is_empty() {
            return None;
        }
        let index = if let Some(index) = self.group_lookup.get(group.members()) {
            *index
        } else {
            let index = GroupIndex(self.groups.len());
            self.group_lookup.insert(group.members().to_vec(), index);
            self.groups.push(Some(group));
            index
        };
        let members = self
            .group(index)
            .map(|group| group.members().to_vec())
            .unwrap_or_default();
        for member in members {
            if let Some(protein) = self.protein_mut(member) {
                protein.groups.insert(index);
            }
        }
        Some(index)
    }

    /// Take a protein out of the groups it is in. A group that is left empty is dropped.
    pub(crate) fn detach_from_groups(&mut self, protein: ProteinIndex) {
        let groups = self
            .protein_mut(protein)
            .map(|p| std::mem::take(&mut p.groups))
            .unwrap_or_default();
        for index in groups {
            let Some(group) = self.groups.get_mut(index.0).and_then(Option::as_mut) else {
                continue;
            };
            let previous = group.members().to_vec();
            if group.remove(protein) {
                self.rekey_group(index, &previous);
            }
        }
    }

    /// Replace a member of a group, the replacement joins the group
    fn replace_in_group(&mut self, index: GroupIndex, from: ProteinIndex, to: ProteinIndex) {
        let Some(group) = self.groups.get_mut(index.0).and_then(Option::as_mut) else {
            return;
        };
        let previous = group.members().to_vec();
        group.replace(from, to);
        if let Some(protein) = self.protein_mut(to) {
            protein.groups.insert(index);
        }
        self.rekey_group(index, &previous);
    }

    /// Update the lookup after the members of a group changed. An empty group is dropped, a group
    /// that now has the same members as another group is merged into that group.
    fn rekey_group(&mut self, index: GroupIndex, previous: &[ProteinIndex]) {
        if self.group_lookup.get(previous) == Some(&index) {
            self.group_lookup.remove(previous);
        }
        let Some(members) = self.group(index).map(|group| group.members().to_vec()) else {
            return;
        };
        let existing = self.group_lookup.get(members.as_slice()).copied();
        let merged_into = match existing {
            _ if members.is_empty() => None,
            Some(existing) if existing != index => Some(existing),
            _ => {
                self.group_lookup.insert(members, index);
                return;
            }
        };
        if let Some(slot) = self.groups.get_mut(index.0) {
            *slot = None;
        }
        for member in members {
            if let Some(protein) = self.protein_mut(member) {
                protein.groups.shift_remove(&index);
                protein.groups.extend(merged_into);
            }
        }
    }

    /// Remove a PSM from all maps
    pub(crate) fn remove_psm(&mut self, index: PsmIndex) -> Option<Psm> {
        let psm = self.psms.get_mut(index.0).and_then(Option::take)?;
        self.psm_by_identifier.shift_remove(&psm.identifier);
        if let Some(bucket) = self.psms_by_sequence.get_mut(psm.full_sequence()) {
            bucket.shift_remove(&index);
            if bucket.is_empty() {
                self.psms_by_sequence.shift_remove(psm.full_sequence());
            }
        }
        for protein in psm.proteins() {
            if let Some(protein) = self.protein_mut(protein) {
                protein.psms.shift_remove(&index);
            }
        }
        Some(psm)
    }

    /// Absorb the protein at `from` into the protein at `to`, all PSM links and accession keys that
    /// pointed at `from` are moved to `to`. If `to` is in a group it stays there and `from` leaves
    /// its group, otherwise `to` takes the place of `from` in its group.
    pub(crate) fn redirect(&mut self, from: ProteinIndex, to: ProteinIndex) {
        let Some(target) = self.protein_by_index(to) else {
            return;
        };
        if from == to {
            return;
        }
        if !target.groups.is_empty() {
            self.detach_from_groups(from);
        }
        let Some(mut absorbed) = self.proteins.get_mut(from.0).and_then(Option::take) else {
            return;
        };
        for psm in absorbed.psms() {
            if let Some(psm) = self.psm_mut(psm) {
                psm.proteins.shift_remove(&from);
                psm.proteins.insert(to);
            }
        }
        for group in std::mem::take(&mut absorbed.groups) {
            self.replace_in_group(group, from, to);
        }
        for index in self.protein_by_accession.values_mut() {
            if *index == from {
                *index = to;
            }
        }
        if let Some(target) = self.protein_mut(to) {
            target.fill_gaps_from(absorbed);
        }
    }
}

use itertools::Itertools;
use tracing::{debug, info};

use crate::{
    accession::parse_accession,
    collaborators::AccessionAuthority,
    error::DtaSelectError,
    group::{ProteinIndex, PsmIndex},
    report::DtaSelectReport,
};

impl DtaSelectReport {
    /// Remove all PSMs without any protein, these are left behind when all proteins of their group
    /// were decoys. Returns the number of removed PSMs.
    pub(crate) fn remove_orphan_psms(&mut self) -> usize {
        let orphans: Vec<PsmIndex> = self
            .psms()
            .filter(|(_, psm)| psm.proteins.is_empty())
            .map(|(index, _)| index)
            .collect();
        for index in &orphans {
            self.remove_psm(*index);
        }
        if !orphans.is_empty() {
            info!(removed = orphans.len(), "Removed PSMs without proteins");
        }
        orphans.len()
    }

    /// Register the canonical accession and all aliases of proteins with an accession in a legacy
    /// scheme. Like [`Self::canonicalize`] the authority is asked about the accession as extracted
    /// from the locus. No new proteins are created and existing keys are never overwritten.
    /// # Errors
    /// If the authority fails, the batches before the failing one are applied.
    pub(crate) fn expand_aliases(
        &mut self,
        authority: &dyn AccessionAuthority,
        batch_size: usize,
    ) -> Result<(), DtaSelectError> {
        let original = self.protein_by_accession.len();
        let candidates: Vec<(String, ProteinIndex)> = self
            .accessions()
            .map(|(accession, index)| (parse_accession(accession).0, index))
            .filter(|(accession, _)| authority.is_alternate_scheme(accession))
            .collect();

        for batch in &candidates.into_iter().chunks(batch_size) {
            let batch = batch.collect_vec();
            let keys = batch
                .iter()
                .map(|(key, _)| key.clone())
                .unique()
                .collect_vec();
            let resolved = authority.canonicalize(&keys)?;
            for (key, index) in batch {
                let Some(canonical) = resolved.get(&key) else {
                    continue;
                };
                for alias in std::iter::once(&canonical.canonical).chain(&canonical.aliases) {
                    if !alias.is_empty() {
                        self.protein_by_accession
                            .entry(alias.clone())
                            .or_insert(index);
                    }
                }
            }
        }

        if original != self.protein_by_accession.len() {
            info!(
                from = original,
                to = self.protein_by_accession.len(),
                "Expanded the accession map with aliases"
            );
        }
        Ok(())
    }

    /// Rename every protein to its canonical accession, when another protein already has that
    /// accession both are merged. The accession itself is sent to the authority in the form
    /// extracted from the locus (see [`parse_accession`]).
    /// # Errors
    /// If the authority fails, the batches before the failing one are applied.
    pub(crate) fn canonicalize(
        &mut self,
        authority: &dyn AccessionAuthority,
        batch_size: usize,
    ) -> Result<(), DtaSelectError> {
        let proteins: Vec<(ProteinIndex, String)> = self
            .proteins()
            .map(|(index, protein)| (index, parse_accession(protein.accession()).0))
            .collect();
        let mut renamed: usize = 0;
        let mut merged: usize = 0;

        for batch in &proteins.into_iter().chunks(batch_size) {
            let batch = batch.collect_vec();
            let keys = batch
                .iter()
                .map(|(_, key)| key.clone())
                .unique()
                .collect_vec();
            let resolved = authority.canonicalize(&keys)?;
            for (index, key) in batch {
                let Some(canonical) = resolved.get(&key).map(|c| c.canonical.as_str()) else {
                    continue;
                };
                if canonical.is_empty() || key == canonical || key.contains(canonical) {
                    continue;
                }
                let Some(current) = self.protein_by_index(index).map(|p| p.accession.clone())
                else {
                    continue;
                };
                if current == canonical {
                    continue;
                }
                debug!(from = %current, to = %canonical, "Replacing accession");
                if self.protein_by_accession.get(&current) == Some(&index) {
                    self.protein_by_accession.shift_remove(&current);
                }
                match self.protein_index(canonical) {
                    Some(existing) if existing != index && self.protein_by_index(existing).is_some() => {
                        self.redirect(index, existing);
                        merged += 1;
                    }
                    _ => {
                        if let Some(protein) = self.protein_mut(index) {
                            protein.accession = canonical.to_string();
                        }
                        self.protein_by_accession
                            .insert(canonical.to_string(), index);
                        renamed += 1;
                    }
                }
            }
        }

        info!(renamed, merged, "Canonicalized protein accessions");
        Ok(())
    }
}

#[allow(clippy::missing_panics_doc)]
#[cfg(test)]
mod tests {
    use std::{cell::Cell, collections::HashMap};

    use context_error::{BoxedError, Context, CreateError, FullErrorContent};

    use super::*;
    use crate::{
        collaborators::CanonicalAccession, error::DtaSelectErrorKind, group::ProteinGroup,
        protein::Protein,
    };

    fn protein(accession: &str) -> Protein {
        Protein {
            accession: accession.to_string(),
            locus: accession.to_string(),
            ..Protein::default()
        }
    }

    fn group(members: &[ProteinIndex]) -> ProteinGroup {
        let mut group = ProteinGroup::default();
        for member in members {
            group.insert(*member);
        }
        group
    }

    /// Resolves the first batch and fails on every batch after that
    struct FailsAfterFirstBatch {
        calls: Cell<usize>,
        known: HashMap<String, CanonicalAccession>,
    }

    impl AccessionAuthority for FailsAfterFirstBatch {
        fn canonicalize(
            &self,
            accessions: &[String],
        ) -> Result<HashMap<String, CanonicalAccession>, DtaSelectError> {
            self.calls.set(self.calls.get() + 1);
            if self.calls.get() > 1 {
                return Err(BoxedError::new(
                    DtaSelectErrorKind::Collaborator,
                    "Authority unavailable",
                    "The connection to the accession authority was lost",
                    Context::none(),
                ));
            }
            self.known.canonicalize(accessions)
        }
    }

    #[test]
    fn redirect_moves_keys_and_groups() {
        let mut report = DtaSelectReport::default();
        let p1 = report.insert_protein(protein("P1"));
        let p2 = report.insert_protein(protein("P2"));
        let mut group = ProteinGroup::default();
        group.insert(p1);
        group.insert(p2);
        let g = report.seal_group(group).unwrap();
        report.protein_by_accession.insert("ALIAS".to_string(), p1);

        report.redirect(p1, p2);
        assert!(report.protein_by_index(p1).is_none());
        assert_eq!(report.protein_index("ALIAS"), Some(p2));
        assert_eq!(report.protein_index("P1"), Some(p2));
        assert_eq!(report.group(g).unwrap().members(), [p2]);
        assert_eq!(report.protein_by_index(p2).unwrap().groups().collect::<Vec<_>>(), [g]);
    }

    #[test]
    fn merge_keeps_the_group_of_the_target() {
        let mut report = DtaSelectReport::default();
        let p1 = report.insert_protein(protein("P1"));
        let p2 = report.insert_protein(protein("P2"));
        let first = report.seal_group(group(&[p1])).unwrap();
        let second = report.seal_group(group(&[p2])).unwrap();

        report.redirect(p1, p2);
        assert!(report.group(first).is_none());
        assert_eq!(report.number_of_groups(), 1);
        assert_eq!(report.protein_by_index(p2).unwrap().groups().collect::<Vec<_>>(), [second]);
    }

    #[test]
    fn merge_into_ungrouped_protein() {
        let mut report = DtaSelectReport::default();
        let p1 = report.insert_protein(protein("P1"));
        let p2 = report.insert_protein(protein("P2"));
        let p3 = report.insert_protein(protein("P3"));
        let g = report.seal_group(group(&[p1, p3])).unwrap();

        report.redirect(p1, p2);
        assert_eq!(report.group(g).unwrap().members(), [p2, p3]);
        assert_eq!(report.protein_by_index(p2).unwrap().groups().collect::<Vec<_>>(), [g]);
        assert_eq!(report.seal_group(group(&[p2, p3])), Some(g));
        assert_eq!(report.number_of_groups(), 1);
    }

    #[test]
    fn detach_drops_empty_groups() {
        let mut report = DtaSelectReport::default();
        let p1 = report.insert_protein(protein("P1"));
        let p2 = report.insert_protein(protein("P2"));
        let g = report.seal_group(group(&[p1, p2])).unwrap();

        report.detach_from_groups(p1);
        assert_eq!(report.group(g).unwrap().members(), [p2]);
        assert_eq!(report.protein_by_index(p1).unwrap().groups().len(), 0);
        report.detach_from_groups(p2);
        assert!(report.group(g).is_none());
        assert_eq!(report.number_of_groups(), 0);
        assert_eq!(report.groups().count(), 0);
    }

    #[test]
    fn identical_groups_are_merged() {
        let mut report = DtaSelectReport::default();
        let p1 = report.insert_protein(protein("P1"));
        let p2 = report.insert_protein(protein("P2"));
        let pair = report.seal_group(group(&[p1, p2])).unwrap();
        let single = report.seal_group(group(&[p1])).unwrap();

        report.detach_from_groups(p2);
        assert!(report.group(pair).is_none());
        assert_eq!(report.group(single).unwrap().members(), [p1]);
        assert_eq!(report.protein_by_index(p1).unwrap().groups().collect::<Vec<_>>(), [single]);
        assert_eq!(report.number_of_groups(), 1);
    }

    #[test]
    fn rename_without_collision() {
        let mut report = DtaSelectReport::default();
        let p1 = report.insert_protein(protein("IPI00000001.2"));
        let authority = HashMap::from([(
            "IPI00000001.2".to_string(),
            CanonicalAccession::new("P12345", Vec::new()),
        )]);
        report.canonicalize(&authority, 500).unwrap();
        assert_eq!(report.protein_index("P12345"), Some(p1));
        assert_eq!(report.protein_index("IPI00000001.2"), None);
        assert_eq!(report.protein_by_index(p1).unwrap().accession(), "P12345");
    }

    #[test]
    fn failed_batch_keeps_accessions() {
        let mut report = DtaSelectReport::default();
        let p1 = report.insert_protein(protein("P1"));
        let p2 = report.insert_protein(protein("P2"));
        let authority = FailsAfterFirstBatch {
            calls: Cell::new(0),
            known: HashMap::from([
                ("P1".to_string(), CanonicalAccession::new("Q1", Vec::new())),
                ("P2".to_string(), CanonicalAccession::new("Q2", Vec::new())),
            ]),
        };
        let error = report.canonicalize(&authority, 1).unwrap_err();
        assert!(matches!(error.get_kind(), DtaSelectErrorKind::Collaborator));
        assert_eq!(report.protein_by_index(p1).unwrap().accession(), "Q1");
        assert_eq!(report.protein_by_index(p2).unwrap().accession(), "P2");
        assert_eq!(report.protein_index("P2"), Some(p2));
        assert_eq!(report.protein_index("Q2"), None);
    }

    #[test]
    fn isoform_kept() {
        let mut report = DtaSelectReport::default();
        report.insert_protein(protein("P12345-2"));
        let authority = HashMap::from([(
            "P12345-2".to_string(),
            CanonicalAccession::new("P12345", Vec::new()),
        )]);
        report.canonicalize(&authority, 1).unwrap();
        assert!(report.protein("P12345-2").is_some());
        assert!(report.protein("P12345").is_none());
    }

    #[test]
    fn aliases_do_not_overwrite() {
        let mut report = DtaSelectReport::default();
        let ipi = report.insert_protein(protein("IPI00000001.2"));
        let other = report.insert_protein(protein("Q99999"));
        let authority = HashMap::from([(
            "IPI00000001.2".to_string(),
            CanonicalAccession::new(
                "P12345",
                ["Q99999".to_string(), "IPI00000001".to_string()],
            ),
        )]);
        report.expand_aliases(&authority, 500).unwrap();
        assert_eq!(report.protein_index("P12345"), Some(ipi));
        assert_eq!(report.protein_index("IPI00000001"), Some(ipi));
        assert_eq!(report.protein_index("Q99999"), Some(other));
        assert_eq!(report.number_of_proteins(), 2);
        assert_eq!(report.accessions().len(), 4);
    }

    #[test]
    fn aliases_for_full_loci() {
        let mut report = DtaSelectReport::default();
        let ipi = report.insert_protein(protein("IPI:IPI00000001.2|SWISS-PROT:O95793-1"));
        let authority = HashMap::from([(
            "IPI00000001.2".to_string(),
            CanonicalAccession::new("P12345", ["Q11111".to_string()]),
        )]);
        report.expand_aliases(&authority, 500).unwrap();
        assert_eq!(report.protein_index("P12345"), Some(ipi));
        assert_eq!(report.protein_index("Q11111"), Some(ipi));
        assert_eq!(report.accessions().len(), 3);
    }
}

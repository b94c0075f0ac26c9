use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The scheme an accession belongs to
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum AccessionKind {
    /// A UniProtKB accession, `P12345` or `A0A023GPI8-2`
    UniProt,
    /// An International Protein Index accession, `IPI00000001.2`, a legacy scheme
    Ipi,
    /// An NCBI accession, `gi|12345` or `ref|NP_000001.1|`
    Ncbi,
    /// Anything else
    #[default]
    Other,
}

static UNIPROT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([OPQ][0-9][A-Z0-9]{3}[0-9]|[A-NR-Z][0-9]([A-Z][A-Z0-9]{2}[0-9]){1,2})(-\d+)?$")
        .unwrap()
});

const DECOY_PREFIXES: &[&str] = &["Reverse_", "rev_"];

/// Extract the accession from a locus as written in a report. Pipe separated FASTA style loci are
/// broken down to the accession (`sp|P12345|NAME_HUMAN` gives `P12345`), a leading `>` is removed,
/// and decoy prefixes (`Reverse_`, `rev_`) are kept on the result.
pub fn parse_accession(locus: &str) -> (String, AccessionKind) {
    let locus = locus.trim();
    let locus = locus.strip_prefix('>').unwrap_or(locus);
    let (prefix, rest) = DECOY_PREFIXES
        .iter()
        .find_map(|prefix| {
            (locus.len() > prefix.len()
                && locus
                    .get(..prefix.len())
                    .is_some_and(|start| start.eq_ignore_ascii_case(prefix)))
            .then(|| locus.split_at(prefix.len()))
        })
        .unwrap_or(("", locus));
    let rest = rest.split_whitespace().next().unwrap_or_default();
    let mut parts = rest.split('|');
    let first = parts.next().unwrap_or_default();

    let (accession, kind) = match (first.to_ascii_lowercase().as_str(), parts.next()) {
        ("sp" | "tr", Some(accession)) => (accession, AccessionKind::UniProt),
        ("gi" | "ref" | "gb" | "emb" | "dbj" | "pir" | "prf", Some(accession)) => {
            (accession, AccessionKind::Ncbi)
        }
        _ => {
            let first = first.strip_prefix("IPI:").unwrap_or(first);
            (first, kind_of(first))
        }
    };
    (format!("{prefix}{accession}"), kind)
}

/// Determine the scheme of a bare accession
pub fn accession_kind(accession: &str) -> AccessionKind {
    parse_accession(accession).1
}

fn kind_of(accession: &str) -> AccessionKind {
    if accession.starts_with("IPI") {
        AccessionKind::Ipi
    } else if UNIPROT.is_match(accession) {
        AccessionKind::UniProt
    } else {
        AccessionKind::Other
    }
}

#[allow(clippy::missing_panics_doc)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniprot() {
        assert_eq!(
            parse_accession("sp|P12345|AATM_RABIT"),
            ("P12345".to_string(), AccessionKind::UniProt)
        );
        assert_eq!(
            parse_accession("tr|A0A023GPI8|A0A023GPI8_CANAL"),
            ("A0A023GPI8".to_string(), AccessionKind::UniProt)
        );
        assert_eq!(
            parse_accession("Q9Y6K9-2"),
            ("Q9Y6K9-2".to_string(), AccessionKind::UniProt)
        );
        assert_eq!(accession_kind("P12345"), AccessionKind::UniProt);
    }

    #[test]
    fn decoys() {
        assert_eq!(
            parse_accession("Reverse_sp|P12345|AATM_RABIT"),
            ("Reverse_P12345".to_string(), AccessionKind::UniProt)
        );
        assert_eq!(
            parse_accession(">rev_sp|P0C1U8|SSPA_STAAU"),
            ("rev_P0C1U8".to_string(), AccessionKind::UniProt)
        );
    }

    #[test]
    fn ipi() {
        assert_eq!(
            parse_accession("IPI:IPI00000001.2|SWISS-PROT:O95793-1|TREMBL:Q59F99"),
            ("IPI00000001.2".to_string(), AccessionKind::Ipi)
        );
        assert_eq!(
            parse_accession("IPI00000001.2"),
            ("IPI00000001.2".to_string(), AccessionKind::Ipi)
        );
    }

    #[test]
    fn ncbi_and_other() {
        assert_eq!(
            parse_accession("gi|12345|ref|NP_000001.1|"),
            ("12345".to_string(), AccessionKind::Ncbi)
        );
        assert_eq!(
            parse_accession("contaminant_KERATIN01 description"),
            ("contaminant_KERATIN01".to_string(), AccessionKind::Other)
        );
    }
}

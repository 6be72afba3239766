//! Checksums and composition statistics for nucleotide and protein sequences.
//!
//! Sequence checksums are the lowercase hex MD5 of the uppercased sequence,
//! which is what stored contig and feature records declare in their `md5`
//! fields.

/// MD5 of the uppercased sequence, as lowercase hex.
pub fn sequence_md5(sequence: &str) -> String {
    format!("{:x}", md5::compute(sequence.to_ascii_uppercase().as_bytes()))
}

/// Compare a sequence against a declared checksum, case-insensitively.
pub fn verify_sequence_md5(sequence: &str, declared: &str) -> bool {
    sequence_md5(sequence).eq_ignore_ascii_case(declared.trim())
}

/// Drop every ASCII whitespace byte (line breaks in FASTA bodies included).
pub fn strip_whitespace(raw: &[u8]) -> Vec<u8> {
    raw.iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect()
}

/// Fraction of `G`/`C` bases, case-insensitive. `None` for an empty sequence.
pub fn gc_content(sequence: &str) -> Option<f64> {
    if sequence.is_empty() {
        return None;
    }
    let gc = sequence
        .bytes()
        .filter(|b| matches!(b.to_ascii_uppercase(), b'G' | b'C'))
        .count();
    Some(gc as f64 / sequence.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn md5_is_case_insensitive_on_input() {
        assert_eq!(sequence_md5("acgt"), sequence_md5("ACGT"));
        // md5("ACGT")
        assert_eq!(sequence_md5("ACGT"), "f1f8f4bf413b16ad135722aa4591043e");
    }

    #[test]
    fn verify_accepts_uppercase_declared_hex() {
        let declared = sequence_md5("ATGC").to_uppercase();
        assert!(verify_sequence_md5("atgc", &declared));
        assert!(!verify_sequence_md5("ATGG", &declared));
    }

    #[test]
    fn strip_whitespace_removes_fasta_line_breaks() {
        assert_eq!(strip_whitespace(b"ACGT\nAC GT\r\n\tA"), b"ACGTACGTA".to_vec());
    }

    #[test]
    fn gc_content_of_known_sequences() {
        assert_eq!(gc_content(""), None);
        assert_eq!(gc_content("GGCC"), Some(1.0));
        assert_eq!(gc_content("atgc"), Some(0.5));
    }

    proptest! {
        #[test]
        fn stripped_output_has_no_whitespace(raw in proptest::collection::vec(any::<u8>(), 0..256)) {
            let stripped = strip_whitespace(&raw);
            prop_assert!(stripped.iter().all(|b| !b.is_ascii_whitespace()));
            let kept = raw.iter().filter(|b| !b.is_ascii_whitespace()).count();
            prop_assert_eq!(stripped.len(), kept);
        }

        #[test]
        fn gc_content_is_a_fraction(seq in "[ACGTacgtN]{1,200}") {
            let gc = gc_content(&seq).unwrap();
            prop_assert!((0.0..=1.0).contains(&gc));
        }
    }
}

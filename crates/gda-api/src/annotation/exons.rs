//! Exon slicing and UTR derivation for mRNA features.
//!
//! An mRNA's `dna_sequence` is the concatenation of its exons in location
//! order, so exon `i` covers the bases following the lengths of exons
//! `0..i`.

use super::model::{Exon, MrnaUtrs, Region, Strand, Utr};

/// `length` bytes of `sequence` from `offset`, clamped to the sequence.
fn segment(sequence: &str, offset: i64, length: i64) -> &str {
    let clamp = |v: i64| usize::try_from(v.max(0)).unwrap_or(usize::MAX).min(sequence.len());
    let start = clamp(offset);
    let end = clamp(offset.saturating_add(length.max(0))).max(start);
    sequence.get(start..end).unwrap_or("")
}

/// Offset of the last `len` bases of an exon starting at `offset`.
fn tail_offset(offset: i64, exon_length: i64, len: i64) -> i64 {
    offset.saturating_add(exon_length).saturating_sub(len)
}

/// One exon per location of an mRNA, with its slice of the mRNA sequence.
pub fn mrna_exons(locations: &[Region], sequence: &str) -> Vec<Exon> {
    let mut offset = 0i64;
    locations
        .iter()
        .enumerate()
        .map(|(ordinal, location)| {
            let exon = Exon {
                location: location.clone(),
                dna_sequence: segment(sequence, offset, location.length).to_string(),
                ordinal,
            };
            offset = offset.saturating_add(location.length);
            exon
        })
        .collect()
}

#[derive(Default)]
struct UtrBuilder {
    locations: Vec<Region>,
    sequence: String,
}

impl UtrBuilder {
    fn push(&mut self, location: Region, sequence: &str) {
        self.locations.push(location);
        self.sequence.push_str(sequence);
    }

    fn finish(self) -> Option<Utr> {
        (!self.locations.is_empty()).then(|| Utr {
            locations: self.locations,
            dna_sequence: self.sequence,
        })
    }
}

/// The 5' and 3' untranslated regions of an mRNA relative to its CDS.
///
/// Returns `None` when the CDS has no locations or an unknown strand.
/// Exons wholly outside the CDS contribute whole; an exon the CDS starts or
/// ends inside contributes the part outside it.
pub fn mrna_utrs(exons: &[Region], sequence: &str, cds: &[Region]) -> Option<MrnaUtrs> {
    let (first, last) = (cds.first()?, cds.last()?);
    let mut five = UtrBuilder::default();
    let mut three = UtrBuilder::default();
    let mut offset = 0i64;

    match first.strand {
        Strand::Plus => {
            let cds_min = first.start;
            let cds_max = last.start.saturating_add(last.length);
            for exon in exons {
                let (exon_min, exon_max) = (exon.start, exon.start.saturating_add(exon.length));
                let bases = segment(sequence, offset, exon.length);
                if exon_max <= cds_min {
                    five.push(exon.clone(), bases);
                } else if exon_min < cds_min && cds_min < exon_max {
                    let len = cds_min.saturating_sub(exon_min);
                    let region = Region::new(&exon.contig_id, exon_min, exon.strand, len);
                    five.push(region, segment(sequence, offset, len));
                }
                if exon_min >= cds_max {
                    three.push(exon.clone(), bases);
                } else if exon_min < cds_max && cds_max < exon_max {
                    let len = exon_max.saturating_sub(cds_max);
                    let region = Region::new(&exon.contig_id, cds_max, exon.strand, len);
                    three.push(region, segment(sequence, tail_offset(offset, exon.length, len), len));
                }
                offset = offset.saturating_add(exon.length);
            }
        }
        Strand::Minus => {
            // `start` is the high coordinate; transcription runs downward.
            let cds_max = first.start;
            let cds_min = last.start.saturating_sub(last.length);
            for exon in exons {
                let (exon_min, exon_max) = (exon.start.saturating_sub(exon.length), exon.start);
                let bases = segment(sequence, offset, exon.length);
                if exon_min >= cds_max {
                    five.push(exon.clone(), bases);
                } else if exon_min < cds_max && cds_max < exon_max {
                    let len = exon_max.saturating_sub(cds_max);
                    let region = Region::new(&exon.contig_id, exon_max, exon.strand, len);
                    five.push(region, segment(sequence, offset, len));
                }
                if exon_max <= cds_min {
                    three.push(exon.clone(), bases);
                } else if exon_min < cds_min && cds_min < exon_max {
                    let len = cds_min.saturating_sub(exon_min);
                    let region = Region::new(&exon.contig_id, cds_min, exon.strand, len);
                    three.push(region, segment(sequence, tail_offset(offset, exon.length, len), len));
                }
                offset = offset.saturating_add(exon.length);
            }
        }
        Strand::Unknown => return None,
    }

    Some(MrnaUtrs {
        five_prime: five.finish(),
        three_prime: three.finish(),
    })
}

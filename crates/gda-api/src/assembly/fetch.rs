//! Contig sequence retrieval from FASTA blobs.
//!
//! Each contig's bases sit at a known byte offset of the assembly's blob,
//! interleaved with header and line-break bytes. Small requests read one
//! byte range per contig; large ones read the whole blob once and slice it.

use std::collections::BTreeMap;

use bytes::Bytes;
use gda_crypto::{strip_whitespace, verify_sequence_md5};
use gda_types::ObjectRef;
use tracing::{debug, warn};

use crate::client::Services;
use crate::error::{ApiError, ApiResult};

/// How to read the requested contigs out of the blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchPlan {
    Whole,
    Ranged,
}

impl FetchPlan {
    /// `requested == 0` means every contig. Otherwise ranged reads are used
    /// until more than `total / divisor` contigs are wanted.
    pub fn choose(requested: usize, total: u64, divisor: u64) -> Self {
        let requested = requested as u64;
        if requested == 0 || requested > total / divisor.max(1) {
            FetchPlan::Whole
        } else {
            FetchPlan::Ranged
        }
    }
}

/// Where one contig's bytes sit in the blob.
#[derive(Clone, Debug)]
pub(crate) struct BlobSpan<'a> {
    pub contig_id: &'a str,
    pub start: u64,
    pub num_bytes: u64,
    pub md5: Option<&'a str>,
}

/// Reads contig sequences for one assembly.
pub(crate) struct SequenceFetcher<'a> {
    services: &'a Services,
    assembly: ObjectRef,
}

impl<'a> SequenceFetcher<'a> {
    pub fn new(services: &'a Services, assembly: ObjectRef) -> Self {
        Self { services, assembly }
    }

    /// The blob node behind a stored handle reference.
    ///
    /// Without a resolver, or with handle resolution switched off, the
    /// reference is the node id. A reference the resolver does not know is
    /// also used as-is.
    pub fn node_for(&self, handle_ref: &str) -> ApiResult<String> {
        let resolver = self
            .services
            .handle_resolver()
            .filter(|_| self.services.config().resolve_blob_handles);
        let Some(resolver) = resolver else {
            return Ok(handle_ref.to_string());
        };
        match resolver.resolve_handle(handle_ref)? {
            Some(node) => {
                debug!(handle = handle_ref, node = %node, "blob handle resolved");
                Ok(node)
            }
            None => {
                debug!(handle = handle_ref, "unknown blob handle; using it as node id");
                Ok(handle_ref.to_string())
            }
        }
    }

    /// Sequences for `spans`, keyed by contig id.
    pub fn fetch(
        &self,
        node: &str,
        spans: &[BlobSpan<'_>],
        plan: FetchPlan,
    ) -> ApiResult<BTreeMap<String, String>> {
        debug!(
            assembly = %self.assembly,
            node,
            contigs = spans.len(),
            ?plan,
            "fetching contig sequences"
        );
        let mut sequences = BTreeMap::new();
        match plan {
            FetchPlan::Whole => {
                let blob = self.services.blobs().fetch_whole(node)?;
                for span in spans {
                    let raw = self.slice(&blob, span)?;
                    sequences.insert(span.contig_id.to_string(), self.finish(span, &raw)?);
                }
            }
            FetchPlan::Ranged => {
                let mut ordered: Vec<&BlobSpan<'_>> = spans.iter().collect();
                ordered.sort_by_key(|s| s.start);
                for span in ordered {
                    let raw = self
                        .services
                        .blobs()
                        .fetch_range(node, span.start, span.num_bytes)?;
                    sequences.insert(span.contig_id.to_string(), self.finish(span, &raw)?);
                }
            }
        }
        Ok(sequences)
    }

    fn slice(&self, blob: &Bytes, span: &BlobSpan<'_>) -> ApiResult<Bytes> {
        let end = span.start.checked_add(span.num_bytes);
        match end {
            Some(end) if end <= blob.len() as u64 => {
                Ok(blob.slice(span.start as usize..end as usize))
            }
            _ => Err(ApiError::Malformed {
                reference: self.assembly.to_string(),
                reason: format!(
                    "contig {} spans bytes {}+{} of a {}-byte blob",
                    span.contig_id,
                    span.start,
                    span.num_bytes,
                    blob.len()
                ),
            }),
        }
    }

    fn finish(&self, span: &BlobSpan<'_>, raw: &[u8]) -> ApiResult<String> {
        let sequence =
            String::from_utf8(strip_whitespace(raw)).map_err(|e| ApiError::Malformed {
                reference: self.assembly.to_string(),
                reason: format!("contig {} is not text: {e}", span.contig_id),
            })?;
        if self.services.config().verify_contig_md5 {
            if let Some(declared) = span.md5 {
                if !verify_sequence_md5(&sequence, declared) {
                    warn!(
                        assembly = %self.assembly,
                        contig = span.contig_id,
                        declared,
                        "contig sequence does not match its md5"
                    );
                }
            }
        }
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::fixtures::{World, HUB_ASSEMBLY};
    use gda_store::BlobRequest;

    #[test]
    fn one_third_rule() {
        assert_eq!(FetchPlan::choose(1, 11, 3), FetchPlan::Ranged);
        assert_eq!(FetchPlan::choose(3, 11, 3), FetchPlan::Ranged);
        assert_eq!(FetchPlan::choose(4, 11, 3), FetchPlan::Whole);
        assert_eq!(FetchPlan::choose(0, 11, 3), FetchPlan::Whole);
        assert_eq!(FetchPlan::choose(1, 2, 3), FetchPlan::Whole);
    }

    fn spans() -> Vec<BlobSpan<'static>> {
        vec![
            BlobSpan {
                contig_id: "b",
                start: 11,
                num_bytes: 6,
                md5: None,
            },
            BlobSpan {
                contig_id: "a",
                start: 3,
                num_bytes: 4,
                md5: None,
            },
        ]
    }

    fn world_with_blob() -> World {
        let world = World::new();
        world
            .blobs
            .insert("node-x", &b">a\nAC\nG\n>b\nTT\nTA\n"[..])
            .unwrap();
        world
    }

    #[test]
    fn ranged_reads_run_in_offset_order() {
        let world = world_with_blob();
        let services = world.services();
        world.blobs.clear_requests();
        let fetcher = SequenceFetcher::new(&services, HUB_ASSEMBLY);
        let sequences = fetcher.fetch("node-x", &spans(), FetchPlan::Ranged).unwrap();
        assert_eq!(sequences["a"], "ACG");
        assert_eq!(sequences["b"], "TTTA");
        let starts: Vec<u64> = world
            .blobs
            .requests()
            .into_iter()
            .filter_map(|r| match r {
                BlobRequest::Range { start, .. } => Some(start),
                BlobRequest::Whole { .. } => None,
            })
            .collect();
        assert_eq!(starts, vec![3, 11]);
    }

    #[test]
    fn whole_read_slices_the_same_bases() {
        let world = world_with_blob();
        let services = world.services();
        let fetcher = SequenceFetcher::new(&services, HUB_ASSEMBLY);
        let ranged = fetcher.fetch("node-x", &spans(), FetchPlan::Ranged).unwrap();
        world.blobs.clear_requests();
        let whole = fetcher.fetch("node-x", &spans(), FetchPlan::Whole).unwrap();
        assert_eq!(ranged, whole);
        assert_eq!(
            world.blobs.requests(),
            vec![BlobRequest::Whole {
                node: "node-x".into()
            }]
        );
    }

    #[test]
    fn span_past_blob_end_is_malformed() {
        let world = world_with_blob();
        let services = world.services();
        let fetcher = SequenceFetcher::new(&services, HUB_ASSEMBLY);
        let bad = [BlobSpan {
            contig_id: "z",
            start: 15,
            num_bytes: 50,
            md5: None,
        }];
        assert!(matches!(
            fetcher.fetch("node-x", &bad, FetchPlan::Whole),
            Err(ApiError::Malformed { .. })
        ));
    }

    #[test]
    fn md5_mismatch_still_returns_sequence() {
        let world = world_with_blob();
        let services = world.services();
        let fetcher = SequenceFetcher::new(&services, HUB_ASSEMBLY);
        let wrong = [BlobSpan {
            contig_id: "a",
            start: 3,
            num_bytes: 4,
            md5: Some("00000000000000000000000000000000"),
        }];
        let sequences = fetcher.fetch("node-x", &wrong, FetchPlan::Ranged).unwrap();
        assert_eq!(sequences["a"], "ACG");
    }

    #[test]
    fn handle_hop_follows_config() {
        let world = World::new();
        let services = world.services();
        let fetcher = SequenceFetcher::new(&services, HUB_ASSEMBLY);
        assert_eq!(fetcher.node_for("KBH_11").unwrap(), "node-11");
        assert_eq!(fetcher.node_for("node-raw").unwrap(), "node-raw");

        let off = world.services().with_config(ApiConfig {
            resolve_blob_handles: false,
            ..ApiConfig::default()
        });
        let fetcher = SequenceFetcher::new(&off, HUB_ASSEMBLY);
        assert_eq!(fetcher.node_for("KBH_11").unwrap(), "KBH_11");
    }
}

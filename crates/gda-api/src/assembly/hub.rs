use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use gda_store::ObjectPath;
use serde::Deserialize;
use tracing::debug;

use super::fetch::{BlobSpan, FetchPlan, SequenceFetcher};
use super::{AssemblyQuery, AssemblyStats, ContigRecord, ExternalSourceInfo};
use crate::annotation::query::require_ids;
use crate::cache::CacheSlot;
use crate::error::{ApiError, ApiResult};
use crate::object::ObjectHandle;

/// Stored metadata of one contig; the bases live in the FASTA blob.
#[derive(Clone, Debug, Deserialize)]
struct ContigMeta {
    contig_id: String,
    #[serde(default)]
    length: i64,
    #[serde(default)]
    gc_content: Option<f64>,
    #[serde(default)]
    md5: Option<String>,
    start_position: u64,
    num_bytes: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    is_complete: Option<i64>,
    #[serde(default)]
    is_circular: Option<i64>,
}

impl ContigMeta {
    fn span(&self) -> BlobSpan<'_> {
        BlobSpan {
            contig_id: &self.contig_id,
            start: self.start_position,
            num_bytes: self.num_bytes,
            md5: self.md5.as_deref(),
        }
    }

    fn record(&self, sequence: String) -> ContigRecord {
        ContigRecord {
            contig_id: self.contig_id.clone(),
            md5: self.md5.clone().unwrap_or_default(),
            sequence,
            length: self.length,
            gc_content: self.gc_content,
            name: self.name.clone(),
            description: self.description.clone(),
            is_complete: self.is_complete.map(|v| v == 1),
            is_circular: self.is_circular.map(|v| v == 1),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ContigsSubset {
    #[serde(default)]
    contigs: BTreeMap<String, ContigMeta>,
}

#[derive(Debug, Deserialize)]
struct HubRecord {
    #[serde(default)]
    contigs: BTreeMap<String, ContigMeta>,
    #[serde(default)]
    num_contigs: Option<u64>,
    #[serde(default)]
    fasta_handle_ref: Option<String>,
}

#[derive(Deserialize)]
struct AssemblyId {
    assembly_id: Option<String>,
}

/// A `KBaseGenomeAnnotations.Assembly`: per-contig metadata and summary
/// statistics in the object, sequences in a FASTA blob reached through
/// `fasta_handle_ref`.
#[derive(Debug)]
pub struct HubAssembly {
    handle: ObjectHandle,
    record: CacheSlot<HubRecord>,
}

impl HubAssembly {
    pub fn new(handle: ObjectHandle) -> Self {
        Self {
            handle,
            record: CacheSlot::new(),
        }
    }

    fn record(&self) -> ApiResult<Arc<HubRecord>> {
        self.record.get_or_try_fetch(|| self.handle.typed_data())
    }

    fn malformed(&self, reason: impl Into<String>) -> ApiError {
        ApiError::Malformed {
            reference: self.handle.reference().to_string(),
            reason: reason.into(),
        }
    }

    /// Metadata for `ids`, or every contig. Requested ids are read by path.
    fn metadata<T>(
        &self,
        ids: Option<&[String]>,
        value: impl Fn(&ContigMeta) -> T,
    ) -> ApiResult<BTreeMap<String, T>> {
        match ids {
            None => Ok(self
                .record()?
                .contigs
                .iter()
                .map(|(id, meta)| (id.clone(), value(meta)))
                .collect()),
            Some(ids) => {
                require_ids(ids, "contig")?;
                let paths: Vec<ObjectPath> = ids
                    .iter()
                    .map(|id| ObjectPath::field("contigs").child(id.as_str()))
                    .collect();
                let subset: ContigsSubset = self.handle.typed_subset(&paths)?;
                Ok(subset
                    .contigs
                    .iter()
                    .map(|(id, meta)| (id.clone(), value(meta)))
                    .collect())
            }
        }
    }
}

impl AssemblyQuery for HubAssembly {
    fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    fn get_assembly_id(&self) -> ApiResult<String> {
        let id: AssemblyId = self
            .handle
            .typed_subset(&[ObjectPath::field("assembly_id")])?;
        id.assembly_id
            .ok_or_else(|| self.malformed("assembly has no assembly_id"))
    }

    fn get_external_source_info(&self) -> ApiResult<ExternalSourceInfo> {
        self.handle.typed_subset(&[
            ObjectPath::field("external_source"),
            ObjectPath::field("external_source_id"),
            ObjectPath::field("external_source_origination_date"),
        ])
    }

    fn get_stats(&self) -> ApiResult<AssemblyStats> {
        self.handle.typed_subset(&[
            ObjectPath::field("gc_content"),
            ObjectPath::field("dna_size"),
            ObjectPath::field("num_contigs"),
        ])
    }

    fn get_contig_ids(&self) -> ApiResult<Vec<String>> {
        Ok(self
            .record()?
            .contigs
            .values()
            .map(|c| c.contig_id.clone())
            .collect())
    }

    fn get_contig_lengths(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, i64>> {
        self.metadata(ids, |c| c.length)
    }

    fn get_contig_gc_content(
        &self,
        ids: Option<&[String]>,
    ) -> ApiResult<BTreeMap<String, Option<f64>>> {
        self.metadata(ids, |c| c.gc_content)
    }

    fn get_contigs(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, ContigRecord>> {
        let record = self.record()?;
        let selected: Vec<&ContigMeta> = match ids {
            None => record.contigs.values().collect(),
            Some(ids) => {
                require_ids(ids, "contig")?;
                let distinct: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
                let known: Vec<&ContigMeta> = distinct
                    .iter()
                    .filter_map(|id| record.contigs.get(*id))
                    .collect();
                if known.len() < distinct.len() {
                    debug!(
                        assembly = %self.handle.reference(),
                        unknown = distinct.len() - known.len(),
                        "skipping unknown contig ids"
                    );
                }
                if known.is_empty() {
                    return Ok(BTreeMap::new());
                }
                known
            }
        };

        let total = record
            .num_contigs
            .unwrap_or(record.contigs.len() as u64);
        let requested = if ids.is_some() { selected.len() } else { 0 };
        let plan = FetchPlan::choose(
            requested,
            total,
            self.handle.services().config().whole_fetch_divisor,
        );
        let handle_ref = record
            .fasta_handle_ref
            .as_deref()
            .ok_or_else(|| self.malformed("assembly has no fasta_handle_ref"))?;

        let fetcher = SequenceFetcher::new(self.handle.services(), self.handle.reference());
        let node = fetcher.node_for(handle_ref)?;
        let spans: Vec<BlobSpan<'_>> = selected.iter().map(|c| c.span()).collect();
        let mut sequences = fetcher.fetch(&node, &spans, plan)?;

        Ok(selected
            .into_iter()
            .map(|meta| {
                let sequence = sequences.remove(&meta.contig_id).unwrap_or_default();
                (meta.contig_id.clone(), meta.record(sequence))
            })
            .collect())
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use gda_crypto::{gc_content, sequence_md5};
use gda_store::ObjectPath;
use serde::Deserialize;

use super::{AssemblyQuery, AssemblyStats, ContigRecord, ExternalSourceInfo};
use crate::annotation::query::id_filter;
use crate::cache::CacheSlot;
use crate::error::ApiResult;
use crate::object::ObjectHandle;

#[derive(Debug, Deserialize)]
struct StoredContig {
    id: String,
    #[serde(default)]
    sequence: String,
    #[serde(default)]
    length: Option<i64>,
    #[serde(default)]
    md5: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    complete: Option<i64>,
    #[serde(default)]
    replicon_geometry: Option<String>,
}

impl StoredContig {
    fn length(&self) -> i64 {
        self.length
            .unwrap_or_else(|| i64::try_from(self.sequence.len()).unwrap_or(i64::MAX))
    }

    fn record(&self) -> ContigRecord {
        ContigRecord {
            contig_id: self.id.clone(),
            sequence: self.sequence.clone(),
            length: self.length(),
            gc_content: gc_content(&self.sequence),
            md5: self
                .md5
                .clone()
                .unwrap_or_else(|| sequence_md5(&self.sequence)),
            name: self.name.clone(),
            description: self.description.clone(),
            is_complete: self.complete.map(|c| c == 1),
            is_circular: match self.replicon_geometry.as_deref() {
                Some("circular") => Some(true),
                Some("linear") => Some(false),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContigSetRecord {
    #[serde(default)]
    contigs: Vec<StoredContig>,
}

#[derive(Debug, Default, Deserialize)]
struct SourceSubset {
    #[serde(default)]
    id: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    source_id: String,
}

/// A legacy `KBaseGenomes.ContigSet`: every contig and its sequence stored
/// inline. Statistics are computed from the sequences.
#[derive(Debug)]
pub struct ContigSetAssembly {
    handle: ObjectHandle,
    record: CacheSlot<ContigSetRecord>,
}

impl ContigSetAssembly {
    pub fn new(handle: ObjectHandle) -> Self {
        Self {
            handle,
            record: CacheSlot::new(),
        }
    }

    fn record(&self) -> ApiResult<Arc<ContigSetRecord>> {
        self.record.get_or_try_fetch(|| self.handle.typed_data())
    }

    fn source(&self, fields: &[&str]) -> ApiResult<SourceSubset> {
        let paths: Vec<ObjectPath> = fields.iter().map(|f| ObjectPath::field(*f)).collect();
        self.handle.typed_subset(&paths)
    }

    fn selected<T>(
        &self,
        ids: Option<&[String]>,
        value: impl Fn(&StoredContig) -> T,
    ) -> ApiResult<BTreeMap<String, T>> {
        let wanted = id_filter(ids, "contig")?;
        Ok(self
            .record()?
            .contigs
            .iter()
            .filter(|c| wanted.as_ref().map_or(true, |w| w.contains(c.id.as_str())))
            .map(|c| (c.id.clone(), value(c)))
            .collect())
    }
}

impl AssemblyQuery for ContigSetAssembly {
    fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    fn get_assembly_id(&self) -> ApiResult<String> {
        Ok(self.source(&["id"])?.id)
    }

    fn get_external_source_info(&self) -> ApiResult<ExternalSourceInfo> {
        let source = self.source(&["source", "source_id"])?;
        Ok(ExternalSourceInfo {
            external_source: source.source,
            external_source_id: source.source_id,
            external_source_origination_date: "Unknown".to_string(),
        })
    }

    fn get_stats(&self) -> ApiResult<AssemblyStats> {
        let record = self.record()?;
        let bases: String = record.contigs.iter().map(|c| c.sequence.as_str()).collect();
        let dna_size: i64 = record.contigs.iter().map(StoredContig::length).sum();
        Ok(AssemblyStats {
            gc_content: gc_content(&bases),
            dna_size: u64::try_from(dna_size).unwrap_or(0),
            num_contigs: record.contigs.len() as u64,
        })
    }

    fn get_contig_ids(&self) -> ApiResult<Vec<String>> {
        Ok(self.record()?.contigs.iter().map(|c| c.id.clone()).collect())
    }

    fn get_contig_lengths(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, i64>> {
        self.selected(ids, StoredContig::length)
    }

    fn get_contig_gc_content(
        &self,
        ids: Option<&[String]>,
    ) -> ApiResult<BTreeMap<String, Option<f64>>> {
        self.selected(ids, |c| gc_content(&c.sequence))
    }

    fn get_contigs(&self, ids: Option<&[String]>) -> ApiResult<BTreeMap<String, ContigRecord>> {
        self.selected(ids, StoredContig::record)
    }
}

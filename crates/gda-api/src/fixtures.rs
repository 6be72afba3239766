//! A small reference workspace shared by the unit tests.
//!
//! Everything lives in workspace `Reference` (id 1):
//!
//! - a two-level taxon tree (`taxon` under `parent_taxon`)
//! - `hub_assembly`: eleven contigs in a FASTA blob behind handle `KBH_11`
//! - `contigset` and the monolithic `legacy_genome` built on it
//! - `hub_genome` (two versions) sharded over CDS, mRNA and gene
//!   containers plus a protein container
//! - `model`, an object no adapter accepts

use std::sync::Arc;

use gda_crypto::{gc_content, sequence_md5};
use gda_store::{InMemoryBlobStore, InMemoryHandleResolver, InMemoryObjectStore, StoredRecord};
use gda_types::ObjectRef;
use serde_json::{json, Map, Value};

use crate::client::{DataApi, Services};
use crate::object::ObjectHandle;

pub const TAXON: ObjectRef = ObjectRef::new(1, 1, 1);
pub const PARENT_TAXON: ObjectRef = ObjectRef::new(1, 2, 1);
pub const HUB_ASSEMBLY: ObjectRef = ObjectRef::new(1, 3, 1);
pub const CONTIGSET: ObjectRef = ObjectRef::new(1, 4, 1);
pub const LEGACY_GENOME: ObjectRef = ObjectRef::new(1, 5, 1);
pub const CDS_CONTAINER: ObjectRef = ObjectRef::new(1, 6, 1);
pub const MRNA_CONTAINER: ObjectRef = ObjectRef::new(1, 7, 1);
pub const GENE_CONTAINER: ObjectRef = ObjectRef::new(1, 8, 1);
pub const PROTEIN_CONTAINER: ObjectRef = ObjectRef::new(1, 9, 1);
pub const HUB_GENOME_V1: ObjectRef = ObjectRef::new(1, 10, 1);
pub const HUB_GENOME: ObjectRef = ObjectRef::new(1, 10, 2);
pub const MODEL: ObjectRef = ObjectRef::new(1, 11, 1);

const FASTA_HANDLE: &str = "KBH_11";
const FASTA_NODE: &str = "node-11";

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub struct World {
    pub objects: Arc<InMemoryObjectStore>,
    pub blobs: Arc<InMemoryBlobStore>,
    pub handles: Arc<InMemoryHandleResolver>,
}

impl World {
    pub fn new() -> Self {
        let world = Self {
            objects: Arc::new(InMemoryObjectStore::new()),
            blobs: Arc::new(InMemoryBlobStore::new()),
            handles: Arc::new(InMemoryHandleResolver::new()),
        };
        world.add_taxa();
        world.add_hub_assembly();
        world.add_legacy_genome();
        world.add_sharded_genome();
        world.put(MODEL, "model", "KBaseFBA.FBAModel-1.0", json!({"id": "model"}));
        world
    }

    pub fn services(&self) -> Services {
        Services::new(self.objects.clone(), self.blobs.clone())
            .with_handle_resolver(self.handles.clone())
    }

    pub fn api(&self) -> DataApi {
        DataApi::new(self.services()).unwrap()
    }

    pub fn handle(&self, reference: &str) -> ObjectHandle {
        ObjectHandle::open(&self.services(), reference).unwrap()
    }

    fn put(&self, reference: ObjectRef, name: &str, type_string: &str, data: Value) {
        self.objects
            .insert(StoredRecord::new(reference, name, type_string, data).in_workspace("Reference"))
            .unwrap();
    }

    fn add_taxa(&self) {
        self.put(
            PARENT_TAXON,
            "parent_taxon",
            "KBaseGenomeAnnotations.Taxon-1.0",
            json!({
                "scientific_lineage": "cellular organisms; Bacteria; Proteobacteria; \
                                       Gammaproteobacteria; Enterobacterales; Enterobacteriaceae",
                "scientific_name": "Escherichia",
                "taxonomy_id": 561,
                "domain": "Bacteria",
                "genetic_code": 11
            }),
        );
        self.put(
            TAXON,
            "taxon",
            "KBaseGenomeAnnotations.Taxon-1.0",
            json!({
                "parent_taxon_ref": "1/2/1",
                "scientific_lineage": "cellular organisms; Bacteria; Proteobacteria; \
                                       Gammaproteobacteria; Enterobacterales; Enterobacteriaceae; \
                                       Escherichia",
                "scientific_name": "Escherichia coli",
                "taxonomy_id": 562,
                "kingdom": "Bacteria",
                "domain": "Bacteria",
                "aliases": ["E. coli"],
                "genetic_code": 11
            }),
        );
    }

    fn add_hub_assembly(&self) {
        let mut fasta = String::new();
        let mut contigs = Map::new();
        let mut all_bases = String::new();
        for i in 0..11 {
            let id = format!("contig_{i}");
            let sequence = contig_sequence(i);
            fasta.push_str(&format!(">{id} test contig\n"));
            let start = fasta.len();
            for line in sequence.as_bytes().chunks(8) {
                fasta.push_str(&String::from_utf8_lossy(line));
                fasta.push('\n');
            }
            contigs.insert(
                id.clone(),
                json!({
                    "contig_id": id,
                    "length": sequence.len(),
                    "gc_content": gc_content(&sequence),
                    "md5": sequence_md5(&sequence),
                    "start_position": start,
                    "num_bytes": fasta.len() - start,
                    "name": id,
                    "is_complete": 1,
                    "is_circular": 0
                }),
            );
            all_bases.push_str(&sequence);
        }
        self.blobs.insert(FASTA_NODE, fasta.into_bytes()).unwrap();
        self.handles.insert(FASTA_HANDLE, FASTA_NODE).unwrap();
        self.put(
            HUB_ASSEMBLY,
            "hub_assembly",
            "KBaseGenomeAnnotations.Assembly-4.1",
            json!({
                "assembly_id": "asm_11",
                "external_source": "NCBI",
                "external_source_id": "GCF_000005845.2",
                "external_source_origination_date": "2013-09-26",
                "gc_content": gc_content(&all_bases),
                "dna_size": all_bases.len(),
                "num_contigs": 11,
                "contigs": contigs,
                "fasta_handle_ref": FASTA_HANDLE
            }),
        );
    }

    fn add_legacy_genome(&self) {
        self.put(
            CONTIGSET,
            "contigset",
            "KBaseGenomes.ContigSet-2.0",
            json!({
                "id": "kb|contigset.1",
                "source": "KBase",
                "source_id": "kb|g.0",
                "contigs": [
                    {
                        "id": "c1",
                        "sequence": "ACGTACGTGG",
                        "length": 10,
                        "md5": sequence_md5("ACGTACGTGG"),
                        "name": "chromosome",
                        "complete": 1,
                        "replicon_geometry": "circular"
                    },
                    {"id": "c2", "sequence": "ATATAT"}
                ]
            }),
        );
        self.put(
            LEGACY_GENOME,
            "legacy_genome",
            "KBaseGenomes.Genome-8.0",
            json!({
                "id": "kb|g.0",
                "scientific_name": "Escherichia coli K-12",
                "domain": "Bacteria",
                "genetic_code": 11,
                "taxonomy": "Bacteria; Proteobacteria; Gammaproteobacteria; Enterobacteriales; \
                             Enterobacteriaceae; Escherichia; Escherichia coli",
                "source_id": "83333",
                "contigset_ref": "1/4/1",
                "features": [
                    {
                        "id": "kb|g.0.peg.1",
                        "type": "CDS",
                        "location": [["c1", 1, "+", 6]],
                        "function": "thr operon leader peptide",
                        "aliases": ["thrL", "b0001"],
                        "dna_sequence": "ACGTAC",
                        "protein_translation": "MK"
                    },
                    {
                        "id": "kb|g.0.peg.2",
                        "type": "CDS",
                        "location": [["c1", 9, "-", 3]],
                        "function": "hypothetical protein",
                        "dna_sequence": "GTA"
                    },
                    {
                        "id": "kb|g.0.mRNA.1",
                        "type": "mRNA",
                        "location": [["c1", 1, "+", 3], ["c1", 6, "+", 2]],
                        "dna_sequence": "ACGAC"
                    },
                    {
                        "id": "kb|g.0.rna.1",
                        "type": "rna",
                        "location": [["c2", 2, "+", 4]],
                        "aliases": ["tRNA-Ala"]
                    }
                ]
            }),
        );
    }

    fn add_sharded_genome(&self) {
        let transcript = format!(
            "{}{}{}{}",
            "A".repeat(20),
            "C".repeat(30),
            "G".repeat(60),
            "T".repeat(40)
        );
        self.put(
            CDS_CONTAINER,
            "hub_genome_CDS",
            "KBaseGenomeAnnotations.FeatureContainer-1.0",
            json!({
                "type": "CDS",
                "assembly_ref": "1/3/1",
                "features": {
                    "cds.1": {
                        "feature_id": "cds.1",
                        "type": "CDS",
                        "locations": [["contig_0", 120, "+", 30], ["contig_0", 200, "+", 60]],
                        "function": "aspartokinase I",
                        "aliases": {"thrA": ["UniProt"], "b0002": ["EcoGene"]},
                        "dna_sequence": "ATGCGAGTG",
                        "publications": [[6284691, "PubMed", "", "", "", "", ""]],
                        "CDS_properties": {
                            "associated_mRNA": ["1/7/1", "mrna.1"],
                            "parent_gene": ["1/8/1", "gene.1"],
                            "codes_for_protein_ref": ["1/9/1", "protein.1"]
                        }
                    },
                    "cds.2": {
                        "feature_id": "cds.2",
                        "type": "CDS",
                        "locations": [["contig_1", 500, "-", 90]],
                        "function": "hypothetical protein"
                    }
                }
            }),
        );
        self.put(
            MRNA_CONTAINER,
            "hub_genome_mRNA",
            "KBaseGenomeAnnotations.FeatureContainer-1.0",
            json!({
                "type": "mRNA",
                "assembly_ref": "1/3/1",
                "features": {
                    "mrna.1": {
                        "feature_id": "mrna.1",
                        "type": "mRNA",
                        "locations": [["contig_0", 100, "+", 50], ["contig_0", 200, "+", 100]],
                        "dna_sequence": transcript,
                        "mRNA_properties": {
                            "associated_CDS": ["1/6/1", "cds.1"],
                            "parent_gene": ["1/8/1", "gene.1"]
                        }
                    },
                    "mrna.2": {
                        "feature_id": "mrna.2",
                        "type": "mRNA",
                        "locations": [["contig_1", 600, "-", 120]]
                    }
                }
            }),
        );
        self.put(
            GENE_CONTAINER,
            "hub_genome_gene",
            "KBaseGenomeAnnotations.FeatureContainer-1.0",
            json!({
                "type": "gene",
                "assembly_ref": "1/3/1",
                "features": {
                    "gene.1": {
                        "feature_id": "gene.1",
                        "type": "gene",
                        "locations": [["contig_0", 100, "+", 300]],
                        "gene_properties": {
                            "children_mRNA": [["1/7/1", "mrna.1"]],
                            "children_CDS": [["1/6/1", "cds.1"]]
                        }
                    }
                }
            }),
        );
        self.put(
            PROTEIN_CONTAINER,
            "hub_genome_proteins",
            "KBaseGenomeAnnotations.ProteinContainer-1.0",
            json!({
                "proteins": {
                    "protein.1": {
                        "protein_id": "protein.1",
                        "protein_amino_acid_sequence": "MRVLK",
                        "protein_function": "aspartokinase I",
                        "protein_md5": sequence_md5("MRVLK")
                    },
                    "protein.2": {
                        "amino_acid_sequence": "MA",
                        "function": "hypothetical protein",
                        "translation_derived": true
                    }
                }
            }),
        );

        let hub = |counts: Option<Value>| {
            let mut data = json!({
                "taxon_ref": "1/1/1",
                "assembly_ref": "1/3/1",
                "feature_container_references": {
                    "CDS": "1/6/1",
                    "mRNA": "1/7/1",
                    "gene": "1/8/1"
                },
                "protein_container_ref": "1/9/1",
                "feature_lookup": {
                    "cds.1": [["1/6/1", "cds.1"]],
                    "cds.2": [["1/6/1", "cds.2"]],
                    "mrna.1": [["1/7/1", "mrna.1"]],
                    "mrna.2": [["1/7/1", "mrna.2"]],
                    "gene.1": [["1/8/1", "gene.1"]],
                    "thrA": [["1/6/1", "cds.1"]]
                }
            });
            if let (Some(counts), Some(object)) = (counts, data.as_object_mut()) {
                object.insert("counts_map".into(), counts);
            }
            data
        };
        let hub_type = "KBaseGenomeAnnotations.GenomeAnnotation-1.0";
        self.put(HUB_GENOME_V1, "hub_genome", hub_type, hub(None));
        self.put(
            HUB_GENOME,
            "hub_genome",
            hub_type,
            hub(Some(json!({"CDS": 2, "mRNA": 2, "gene": 1}))),
        );
    }
}

/// A deterministic sequence of `10 + 3i` bases for contig `i`.
fn contig_sequence(i: usize) -> String {
    const BASES: [char; 4] = ['A', 'C', 'G', 'T'];
    (0..10 + 3 * i)
        .map(|j| BASES[(i + j * (j % 3 + 1)) % 4])
        .collect()
}

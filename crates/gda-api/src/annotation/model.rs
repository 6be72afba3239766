use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use gda_crypto::sequence_md5;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "?")]
    Unknown,
}

impl Strand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Unknown => "?",
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strand {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Self::Plus),
            "-" => Ok(Self::Minus),
            "?" => Ok(Self::Unknown),
            other => Err(ApiError::InvalidArgument(format!(
                "strand must be one of +, -, ?: got {other:?}"
            ))),
        }
    }
}

/// A located stretch of a contig.
///
/// For minus-strand regions `start` is the high coordinate and the region
/// runs down to `start - length`. Stored locations are
/// `[contig_id, start, strand, length]` arrays; region filters are objects.
/// Both forms deserialize.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawRegion")]
pub struct Region {
    pub contig_id: String,
    pub start: i64,
    pub strand: Strand,
    pub length: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRegion {
    Tuple(String, i64, Strand, i64),
    Named {
        contig_id: String,
        start: i64,
        strand: Strand,
        length: i64,
    },
}

impl From<RawRegion> for Region {
    fn from(raw: RawRegion) -> Self {
        match raw {
            RawRegion::Tuple(contig_id, start, strand, length)
            | RawRegion::Named {
                contig_id,
                start,
                strand,
                length,
            } => Self {
                contig_id,
                start,
                strand,
                length,
            },
        }
    }
}

impl Region {
    pub fn new(contig_id: impl Into<String>, start: i64, strand: Strand, length: i64) -> Self {
        Self {
            contig_id: contig_id.into(),
            start,
            strand,
            length,
        }
    }

    /// Grouping key: `"{start}-{start + length}"`, regardless of strand.
    pub fn range_key(&self) -> String {
        let end = i128::from(self.start) + i128::from(self.length);
        format!("{}-{}", self.start, end)
    }
}

/// A pointer from one feature to another: `(container reference, feature id)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLink(pub String, pub String);

impl FeatureLink {
    pub fn container(&self) -> &str {
        &self.0
    }

    pub fn feature_id(&self) -> &str {
        &self.1
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CdsProperties {
    #[serde(default)]
    pub codes_for_protein_ref: Option<FeatureLink>,
    #[serde(default, rename = "associated_mRNA")]
    pub associated_mrna: Option<FeatureLink>,
    #[serde(default)]
    pub parent_gene: Option<FeatureLink>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MrnaProperties {
    #[serde(default, rename = "associated_CDS")]
    pub associated_cds: Option<FeatureLink>,
    #[serde(default)]
    pub parent_gene: Option<FeatureLink>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneProperties {
    #[serde(default, rename = "children_mRNA")]
    pub children_mrna: Vec<FeatureLink>,
    #[serde(default, rename = "children_CDS")]
    pub children_cds: Vec<FeatureLink>,
}

/// One feature as stored in a sharded feature container.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub feature_id: String,
    #[serde(rename = "type")]
    pub feature_type: String,
    #[serde(default)]
    pub locations: Vec<Region>,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub aliases: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    pub dna_sequence: Option<String>,
    #[serde(default)]
    pub dna_sequence_length: Option<i64>,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub publications: Option<Vec<Value>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub inference: Option<String>,
    #[serde(default)]
    pub quality: Option<Value>,
    #[serde(default)]
    pub quality_warnings: Option<Vec<String>>,
    #[serde(default, rename = "CDS_properties")]
    pub cds_properties: Option<CdsProperties>,
    #[serde(default, rename = "mRNA_properties")]
    pub mrna_properties: Option<MrnaProperties>,
    #[serde(default)]
    pub gene_properties: Option<GeneProperties>,
}

/// Payload of a feature container.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FeatureContainerData {
    #[serde(default)]
    pub features: BTreeMap<String, FeatureRecord>,
    #[serde(default)]
    pub assembly_ref: Option<String>,
}

/// One feature as stored inline in a legacy genome.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyFeature {
    pub id: String,
    #[serde(rename = "type")]
    pub feature_type: String,
    #[serde(default)]
    pub location: Vec<Region>,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub aliases: Option<Vec<String>>,
    #[serde(default)]
    pub dna_sequence: Option<String>,
    #[serde(default)]
    pub dna_sequence_length: Option<i64>,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub protein_translation: Option<String>,
    #[serde(default)]
    pub publications: Option<Vec<Value>>,
    #[serde(default)]
    pub quality: Option<Value>,
}

/// The uniform public view of one feature.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureView {
    #[serde(rename = "feature_id")]
    pub id: String,
    pub feature_type: String,
    #[serde(rename = "feature_function")]
    pub function: String,
    #[serde(rename = "feature_locations")]
    pub locations: Vec<Region>,
    #[serde(rename = "feature_dna_sequence")]
    pub dna_sequence: String,
    /// `-1` when neither recorded nor derivable.
    #[serde(rename = "feature_dna_sequence_length")]
    pub dna_sequence_length: i64,
    #[serde(rename = "feature_md5")]
    pub md5: String,
    #[serde(rename = "feature_publications")]
    pub publications: Vec<Value>,
    #[serde(rename = "feature_aliases")]
    pub aliases: BTreeMap<String, Vec<String>>,
    #[serde(rename = "feature_notes")]
    pub notes: String,
    #[serde(rename = "feature_inference")]
    pub inference: String,
    #[serde(rename = "feature_quality_score")]
    pub quality_score: Option<Value>,
    #[serde(rename = "feature_quality_warnings")]
    pub quality_warnings: Vec<String>,
}

impl From<&FeatureRecord> for FeatureView {
    fn from(f: &FeatureRecord) -> Self {
        let dna_sequence = f.dna_sequence.clone().unwrap_or_default();
        Self {
            id: f.feature_id.clone(),
            feature_type: f.feature_type.clone(),
            function: f.function.clone().unwrap_or_default(),
            locations: f.locations.clone(),
            dna_sequence_length: f
                .dna_sequence_length
                .unwrap_or_else(|| derived_length(&dna_sequence)),
            md5: f.md5.clone().unwrap_or_else(|| derived_md5(&dna_sequence)),
            dna_sequence,
            publications: f.publications.clone().unwrap_or_default(),
            aliases: f.aliases.clone().unwrap_or_default(),
            notes: f.notes.clone().unwrap_or_default(),
            inference: f.inference.clone().unwrap_or_default(),
            quality_score: f.quality.clone(),
            quality_warnings: f.quality_warnings.clone().unwrap_or_default(),
        }
    }
}

impl From<&LegacyFeature> for FeatureView {
    fn from(f: &LegacyFeature) -> Self {
        let dna_sequence = f.dna_sequence.clone().unwrap_or_default();
        Self {
            id: f.id.clone(),
            feature_type: f.feature_type.clone(),
            function: f.function.clone().unwrap_or_default(),
            locations: f.location.clone(),
            dna_sequence_length: f
                .dna_sequence_length
                .unwrap_or_else(|| derived_length(&dna_sequence)),
            md5: f.md5.clone().unwrap_or_else(|| derived_md5(&dna_sequence)),
            dna_sequence,
            publications: f.publications.clone().unwrap_or_default(),
            // Legacy aliases carry no sources.
            aliases: f
                .aliases
                .iter()
                .flatten()
                .map(|a| (a.clone(), Vec::new()))
                .collect(),
            notes: String::new(),
            inference: String::new(),
            quality_score: f.quality.clone(),
            quality_warnings: Vec::new(),
        }
    }
}

fn derived_length(sequence: &str) -> i64 {
    if sequence.is_empty() {
        -1
    } else {
        i64::try_from(sequence.len()).unwrap_or(i64::MAX)
    }
}

fn derived_md5(sequence: &str) -> String {
    if sequence.is_empty() {
        String::new()
    } else {
        sequence_md5(sequence)
    }
}

/// The uniform public view of one protein. Keys always carry the
/// `protein_` prefix; fields this view does not model are kept in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProteinView {
    #[serde(rename = "protein_id")]
    pub id: String,
    #[serde(rename = "protein_amino_acid_sequence", default)]
    pub amino_acid_sequence: String,
    #[serde(rename = "protein_function", default)]
    pub function: Option<String>,
    #[serde(rename = "protein_aliases", default)]
    pub aliases: Option<Value>,
    #[serde(rename = "protein_md5", default)]
    pub md5: Option<String>,
    #[serde(rename = "protein_domain_locations", default)]
    pub domain_locations: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ProteinView {
    /// Normalise a stored protein record: prefix bare keys with `protein_`
    /// and fill in the id from the container key when the record lacks it.
    pub fn from_stored(key: &str, record: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut normalized: Map<String, Value> = record
            .iter()
            .map(|(k, v)| {
                let k = if k.starts_with("protein_") {
                    k.clone()
                } else {
                    format!("protein_{k}")
                };
                (k, v.clone())
            })
            .collect();
        normalized
            .entry("protein_id")
            .or_insert_with(|| Value::String(key.to_string()));
        serde_json::from_value(Value::Object(normalized))
    }

    /// The protein a legacy feature translates to.
    pub fn from_translation(feature_id: &str, translation: &str) -> Self {
        Self {
            id: format!("{feature_id}.protein"),
            amino_acid_sequence: translation.to_string(),
            function: None,
            aliases: None,
            md5: Some(sequence_md5(translation)),
            domain_locations: None,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Exon {
    #[serde(rename = "exon_location")]
    pub location: Region,
    #[serde(rename = "exon_dna_sequence")]
    pub dna_sequence: String,
    #[serde(rename = "exon_ordinal")]
    pub ordinal: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Utr {
    #[serde(rename = "utr_locations")]
    pub locations: Vec<Region>,
    #[serde(rename = "utr_dna_sequence")]
    pub dna_sequence: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MrnaUtrs {
    #[serde(rename = "5'UTR", skip_serializing_if = "Option::is_none")]
    pub five_prime: Option<Utr>,
    #[serde(rename = "3'UTR", skip_serializing_if = "Option::is_none")]
    pub three_prime: Option<Utr>,
}

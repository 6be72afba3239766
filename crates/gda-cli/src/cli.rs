use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use gda_api::{GroupBy, Region, Strand};

#[derive(Parser)]
#[command(
    name = "gda",
    about = "Genome data API: query genome annotations, assemblies and taxa",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON fixture holding the objects to serve
    #[arg(long, global = true, default_value = "objects.json")]
    pub objects: PathBuf,

    /// Directory of blob files, one per node id
    #[arg(long, global = true, default_value = "blobs")]
    pub blobs: PathBuf,

    /// TOML file with API settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the metadata of one object
    Info(RefArgs),
    /// List the feature types of a genome annotation
    FeatureTypes(RefArgs),
    /// Count features by type
    FeatureCounts(FeatureCountsArgs),
    /// Find feature ids by type, region, function or alias
    FeatureIds(FeatureIdsArgs),
    /// Show features
    Features(FeaturesArgs),
    /// Show the proteins of a genome annotation
    Proteins(RefArgs),
    /// Follow CDS, mRNA and gene relationships
    Xref(XrefArgs),
    /// Fetch contig sequences from an assembly
    Contigs(ContigsArgs),
    /// Show assembly statistics and source
    AssemblyStats(RefArgs),
    /// Show a taxon
    Taxon(RefArgs),
}

#[derive(Args)]
pub struct RefArgs {
    /// Object reference: `ws/obj[/ver]` by name or id
    pub reference: String,
}

#[derive(Args)]
pub struct FeatureCountsArgs {
    pub reference: String,
    #[arg(long = "type")]
    pub types: Vec<String>,
}

#[derive(Args)]
pub struct FeatureIdsArgs {
    pub reference: String,
    #[arg(long = "type")]
    pub types: Vec<String>,
    /// `contig:start:strand:length`, e.g. `chr1:100:+:50`
    #[arg(long = "region", value_parser = parse_region)]
    pub regions: Vec<Region>,
    #[arg(long = "function")]
    pub functions: Vec<String>,
    #[arg(long = "alias")]
    pub aliases: Vec<String>,
    #[arg(long, default_value = "type", value_parser = parse_group_by)]
    pub group_by: GroupBy,
}

#[derive(Args)]
pub struct FeaturesArgs {
    pub reference: String,
    /// Feature ids; all features when omitted
    pub ids: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Relation {
    CdsByMrna,
    MrnaByCds,
    GeneByCds,
    GeneByMrna,
    CdsByGene,
    MrnaByGene,
}

#[derive(Args)]
pub struct XrefArgs {
    pub reference: String,
    pub relation: Relation,
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct ContigsArgs {
    pub reference: String,
    /// Contig ids; all contigs when omitted
    pub ids: Vec<String>,
    /// Omit sequences from the output
    #[arg(long)]
    pub no_sequence: bool,
}

/// Parse `contig:start:strand:length`. The contig id may itself contain `:`.
pub fn parse_region(s: &str) -> Result<Region, String> {
    let mut parts = s.rsplitn(4, ':');
    let (Some(length), Some(strand), Some(start), Some(contig)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected contig:start:strand:length, got {s:?}"));
    };
    let start: i64 = start.parse().map_err(|e| format!("bad start {start:?}: {e}"))?;
    let length: i64 = length
        .parse()
        .map_err(|e| format!("bad length {length:?}: {e}"))?;
    let strand: Strand = strand.parse().map_err(|e| format!("{e}"))?;
    if contig.is_empty() {
        return Err("contig id must not be empty".into());
    }
    Ok(Region::new(contig, start, strand, length))
}

fn parse_group_by(s: &str) -> Result<GroupBy, String> {
    s.parse().map_err(|e| format!("{e}"))
}

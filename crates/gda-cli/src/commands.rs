use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use gda_api::{
    AnnotationQuery, ApiConfig, AssemblyQuery, DataApi, FeatureFilters, Services, TaxonQuery,
};
use gda_store::{DirBlobStore, Fixture};
use serde_json::{json, Value};
use tracing::info;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let api = open_api(&cli)?;
    let (title, output) = run(&api, &cli.command)?;
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Text => {
            println!("{}", title.bold());
            print!("{}", render_text(&output));
        }
    }
    Ok(())
}

/// Build the API over the fixture, blob directory and config named on the
/// command line.
pub fn open_api(cli: &Cli) -> anyhow::Result<DataApi> {
    let fixture = Fixture::load(&cli.objects)
        .with_context(|| format!("loading objects from {}", cli.objects.display()))?;
    let (objects, handles) = fixture.into_stores()?;
    let config = match &cli.config {
        Some(path) => ApiConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ApiConfig::default(),
    };
    info!(blobs = %cli.blobs.display(), "blob directory");
    let services = Services::new(Arc::new(objects), Arc::new(DirBlobStore::new(&cli.blobs)))
        .with_handle_resolver(Arc::new(handles))
        .with_config(config);
    Ok(DataApi::new(services)?)
}

/// Run one command, returning a heading and the result.
pub fn run(api: &DataApi, command: &Command) -> anyhow::Result<(String, Value)> {
    Ok(match command {
        Command::Info(args) => {
            let handle = api.object(&args.reference)?;
            let mut info = serde_json::to_value(handle.info())?;
            if let Some(map) = info.as_object_mut() {
                map.insert(
                    "canonical_type".into(),
                    Value::String(handle.canonical_type().to_string()),
                );
                if let Some(schema) = handle.schema()? {
                    map.insert("schema".into(), schema);
                }
            }
            (format!("Object {}", handle.reference()), info)
        }
        Command::FeatureTypes(args) => {
            let genome = api.genome_annotation(&args.reference)?;
            let types = genome.get_feature_types()?;
            let descriptions = genome.get_feature_type_descriptions(Some(types.as_slice()))?;
            let listed: serde_json::Map<String, Value> = types
                .into_iter()
                .map(|t| {
                    let text = descriptions.get(&t).cloned().unwrap_or_default();
                    (t, Value::String(text))
                })
                .collect();
            ("Feature types".to_string(), Value::Object(listed))
        }
        Command::FeatureCounts(args) => {
            let genome = api.genome_annotation(&args.reference)?;
            let counts = genome.get_feature_type_counts(selection(&args.types))?;
            ("Feature counts".to_string(), serde_json::to_value(counts)?)
        }
        Command::FeatureIds(args) => {
            let genome = api.genome_annotation(&args.reference)?;
            let mut filters = FeatureFilters::new();
            if !args.types.is_empty() {
                filters = filters.types(args.types.iter().cloned());
            }
            if !args.regions.is_empty() {
                filters = filters.regions(args.regions.iter().cloned());
            }
            if !args.functions.is_empty() {
                filters = filters.functions(args.functions.iter().cloned());
            }
            if !args.aliases.is_empty() {
                filters = filters.aliases(args.aliases.iter().cloned());
            }
            let result = genome.get_feature_ids(&filters, args.group_by)?;
            (
                format!("Feature ids by {}", args.group_by),
                serde_json::to_value(result)?,
            )
        }
        Command::Features(args) => {
            let genome = api.genome_annotation(&args.reference)?;
            let features = genome.get_features(selection(&args.ids))?;
            (
                format!("{} features", features.len()),
                serde_json::to_value(features)?,
            )
        }
        Command::Proteins(args) => {
            let proteins = api.genome_annotation(&args.reference)?.get_proteins()?;
            (
                format!("{} proteins", proteins.len()),
                serde_json::to_value(proteins)?,
            )
        }
        Command::Xref(args) => {
            let genome = api.genome_annotation(&args.reference)?;
            let ids = &args.ids;
            let links = match args.relation {
                Relation::CdsByMrna => serde_json::to_value(genome.get_cds_by_mrna(ids)?)?,
                Relation::MrnaByCds => serde_json::to_value(genome.get_mrna_by_cds(ids)?)?,
                Relation::GeneByCds => serde_json::to_value(genome.get_gene_by_cds(ids)?)?,
                Relation::GeneByMrna => serde_json::to_value(genome.get_gene_by_mrna(ids)?)?,
                Relation::CdsByGene => serde_json::to_value(genome.get_cds_by_gene(ids)?)?,
                Relation::MrnaByGene => serde_json::to_value(genome.get_mrna_by_gene(ids)?)?,
            };
            (format!("{:?}", args.relation), links)
        }
        Command::Contigs(args) => {
            let contigs = api
                .assembly(&args.reference)?
                .get_contigs(selection(&args.ids))?;
            let mut output = serde_json::to_value(&contigs)?;
            if args.no_sequence {
                if let Some(map) = output.as_object_mut() {
                    for contig in map.values_mut().filter_map(Value::as_object_mut) {
                        contig.remove("sequence");
                    }
                }
            }
            (format!("{} contigs", contigs.len()), output)
        }
        Command::AssemblyStats(args) => {
            let assembly = api.assembly(&args.reference)?;
            let output = json!({
                "assembly_id": assembly.get_assembly_id()?,
                "stats": assembly.get_stats()?,
                "external_source": assembly.get_external_source_info()?,
                "genome_annotations": assembly.get_genome_annotations()?,
            });
            (format!("Assembly {}", assembly.handle().reference()), output)
        }
        Command::Taxon(args) => {
            let taxon = api.taxon(&args.reference)?;
            let output = json!({
                "scientific_name": taxon.get_scientific_name()?,
                "scientific_lineage": taxon.get_scientific_lineage()?,
                "taxonomic_id": taxon.get_taxonomic_id()?,
                "kingdom": taxon.get_kingdom()?,
                "domain": taxon.get_domain()?,
                "aliases": taxon.get_aliases()?,
                "genetic_code": taxon.get_genetic_code()?,
                "parent": taxon.get_parent()?,
                "children": taxon.get_children()?,
                "genome_annotations": taxon.get_genome_annotations()?,
            });
            (format!("Taxon {}", taxon.handle().reference()), output)
        }
    })
}

/// An empty list on the command line means "everything".
fn selection(ids: &[String]) -> Option<&[String]> {
    (!ids.is_empty()).then_some(ids)
}

/// Indented `key: value` lines for terminal output.
pub fn render_text(value: &Value) -> String {
    let mut out = String::new();
    render_into(value, 1, &mut out);
    out
}

fn render_into(value: &Value, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    match value {
        Value::Object(map) if map.is_empty() => {
            let _ = writeln!(out, "{pad}{}", "(none)".dimmed());
        }
        Value::Object(map) => {
            for (key, v) in map {
                if is_scalar(v) {
                    let _ = writeln!(out, "{pad}{}: {}", key.cyan(), scalar(v));
                } else {
                    let _ = writeln!(out, "{pad}{}:", key.cyan());
                    render_into(v, depth + 1, out);
                }
            }
        }
        Value::Array(items) if items.iter().all(is_scalar) => {
            let joined: Vec<String> = items.iter().map(scalar).collect();
            let _ = writeln!(out, "{pad}{}", joined.join(", "));
        }
        Value::Array(items) => {
            for item in items {
                let _ = writeln!(out, "{pad}-");
                render_into(item, depth + 1, out);
            }
        }
        other => {
            let _ = writeln!(out, "{pad}{}", scalar(other));
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

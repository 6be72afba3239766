//! The filter, group and intersect engine shared by both annotation shapes.
//!
//! Filtering runs in two stages. `type_list` first restricts the candidate
//! set (and, for sharded genomes, which containers are fetched at all).
//! Every other active dimension then computes its own match set over those
//! candidates; the survivors are the features present in every active set.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::{FeatureRecord, LegacyFeature, Region, Strand};
use crate::error::{ApiError, ApiResult};

/// Read access to the fields the engine filters and groups on.
pub trait FilterableFeature {
    fn id(&self) -> &str;
    fn feature_type(&self) -> &str;
    fn locations(&self) -> &[Region];
    fn function(&self) -> Option<&str>;
    /// `None` when the feature records no aliases at all.
    fn alias_names(&self) -> Option<Vec<&str>>;
}

impl FilterableFeature for FeatureRecord {
    fn id(&self) -> &str {
        &self.feature_id
    }

    fn feature_type(&self) -> &str {
        &self.feature_type
    }

    fn locations(&self) -> &[Region] {
        &self.locations
    }

    fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    fn alias_names(&self) -> Option<Vec<&str>> {
        self.aliases
            .as_ref()
            .map(|a| a.keys().map(String::as_str).collect())
    }
}

impl FilterableFeature for LegacyFeature {
    fn id(&self) -> &str {
        &self.id
    }

    fn feature_type(&self) -> &str {
        &self.feature_type
    }

    fn locations(&self) -> &[Region] {
        &self.location
    }

    fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    fn alias_names(&self) -> Option<Vec<&str>> {
        self.aliases
            .as_ref()
            .map(|a| a.iter().map(String::as_str).collect())
    }
}

/// Optional filters for [`get_feature_ids`](super::AnnotationQuery::get_feature_ids).
///
/// An absent filter is inactive; a present but empty list is rejected.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureFilters {
    pub type_list: Option<Vec<String>>,
    pub region_list: Option<Vec<Region>>,
    pub function_list: Option<Vec<String>>,
    pub alias_list: Option<Vec<String>>,
}

impl FeatureFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_list = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn regions(mut self, regions: impl IntoIterator<Item = Region>) -> Self {
        self.region_list = Some(regions.into_iter().collect());
        self
    }

    pub fn functions<I, S>(mut self, functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.function_list = Some(functions.into_iter().map(Into::into).collect());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alias_list = Some(aliases.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(&self) -> ApiResult<()> {
        let empty = [
            ("type_list", self.type_list.as_ref().map(Vec::is_empty)),
            ("region_list", self.region_list.as_ref().map(Vec::is_empty)),
            ("function_list", self.function_list.as_ref().map(Vec::is_empty)),
            ("alias_list", self.alias_list.as_ref().map(Vec::is_empty)),
        ]
        .into_iter()
        .find(|(_, empty)| *empty == Some(true));
        match empty {
            Some((name, _)) => Err(ApiError::InvalidArgument(format!(
                "{name} must not be empty"
            ))),
            None => Ok(()),
        }
    }

    /// Whether `type_list` lets features of `feature_type` through.
    pub fn admits_type(&self, feature_type: &str) -> bool {
        self.type_list
            .as_ref()
            .map_or(true, |types| types.iter().any(|t| t == feature_type))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Type,
    Region,
    Function,
    Alias,
}

impl FromStr for GroupBy {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "type" => Ok(Self::Type),
            "region" => Ok(Self::Region),
            "function" => Ok(Self::Function),
            "alias" => Ok(Self::Alias),
            other => Err(ApiError::InvalidArgument(format!(
                "group_by must be one of type, region, function, alias: got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Type => "type",
            Self::Region => "region",
            Self::Function => "function",
            Self::Alias => "alias",
        })
    }
}

pub type IdGroups = BTreeMap<String, Vec<String>>;

/// `contig_id -> strand -> "start-end" -> ids`.
pub type RegionGroups = BTreeMap<String, BTreeMap<String, IdGroups>>;

/// The ids each active filter dimension matched on its own. A dimension is
/// present only when it matched something.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DimensionMatches {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub types: Option<BTreeSet<String>>,
    #[serde(rename = "region", skip_serializing_if = "Option::is_none")]
    pub regions: Option<BTreeSet<String>>,
    #[serde(rename = "function", skip_serializing_if = "Option::is_none")]
    pub functions: Option<BTreeSet<String>>,
    #[serde(rename = "alias", skip_serializing_if = "Option::is_none")]
    pub aliases: Option<BTreeSet<String>>,
}

impl DimensionMatches {
    pub fn count(&self) -> usize {
        [&self.types, &self.regions, &self.functions, &self.aliases]
            .into_iter()
            .filter(|d| d.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Result of a feature id query. Exactly one `by_*` grouping is present:
/// the one requested.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FeatureIdResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_type: Option<IdGroups>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_region: Option<RegionGroups>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_function: Option<IdGroups>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_alias: Option<IdGroups>,
    #[serde(skip_serializing_if = "DimensionMatches::is_empty")]
    pub matches: DimensionMatches,
    /// Survivors of every active dimension, when more than one matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intersect: Option<BTreeSet<String>>,
}

/// Overlap between a stored feature location and a region filter.
///
/// Plus strand: `max(fs, rs) <= min(fs + fl, rs + rl)`. Minus strand, where
/// `start` is the high end: `max(fs - fl, rs - rl) <= min(fs, rs)`. A region
/// with strand `?` accepts either feature strand under that strand's test.
/// Coordinates are widened so extreme starts and lengths cannot overflow.
pub fn overlaps(location: &Region, region: &Region) -> bool {
    if location.contig_id != region.contig_id {
        return false;
    }
    if region.strand != Strand::Unknown && region.strand != location.strand {
        return false;
    }
    let [fs, fl, rs, rl] =
        [location.start, location.length, region.start, region.length].map(i128::from);
    match location.strand {
        Strand::Minus => (fs - fl).max(rs - rl) <= fs.min(rs),
        Strand::Plus | Strand::Unknown => fs.max(rs) <= (fs + fl).min(rs + rl),
    }
}

fn function_matches(function: Option<&str>, tokens: &[&str]) -> bool {
    function.map_or(false, |f| {
        f.split_whitespace().any(|word| tokens.contains(&word))
    })
}

fn id_set<'a, F: FilterableFeature>(features: impl Iterator<Item = &'a F>) -> BTreeSet<String>
where
    F: 'a,
{
    features.map(|f| f.id().to_string()).collect()
}

/// Filter `features` and group the survivors.
///
/// Filters must already be validated.
pub fn select_features<'a, F>(
    features: impl IntoIterator<Item = &'a F>,
    filters: &FeatureFilters,
    group_by: GroupBy,
) -> FeatureIdResult
where
    F: FilterableFeature + 'a,
{
    let candidates: Vec<&F> = features
        .into_iter()
        .filter(|f| filters.admits_type(f.feature_type()))
        .collect();

    let types = filters
        .type_list
        .as_ref()
        .map(|_| id_set(candidates.iter().copied()));
    let regions = filters.region_list.as_ref().map(|regions| {
        id_set(candidates.iter().copied().filter(|f| {
            f.locations()
                .iter()
                .any(|loc| regions.iter().any(|r| overlaps(loc, r)))
        }))
    });
    let functions = filters.function_list.as_ref().map(|list| {
        let tokens: Vec<&str> = list.iter().flat_map(|f| f.split_whitespace()).collect();
        id_set(
            candidates
                .iter()
                .copied()
                .filter(|f| function_matches(f.function(), &tokens)),
        )
    });
    let aliases = filters.alias_list.as_ref().map(|wanted| {
        id_set(candidates.iter().copied().filter(|f| {
            f.alias_names()
                .map_or(false, |names| wanted.iter().any(|a| names.contains(&a.as_str())))
        }))
    });

    let keep = |set: &Option<BTreeSet<String>>, id: &str| set.as_ref().map_or(true, |s| s.contains(id));
    let survivors: Vec<&F> = candidates
        .into_iter()
        .filter(|f| keep(&regions, f.id()) && keep(&functions, f.id()) && keep(&aliases, f.id()))
        .collect();

    let non_empty = |set: Option<BTreeSet<String>>| set.filter(|s| !s.is_empty());
    let matches = DimensionMatches {
        types: non_empty(types),
        regions: non_empty(regions),
        functions: non_empty(functions),
        aliases: non_empty(aliases),
    };
    let intersect = (matches.count() > 1).then(|| id_set(survivors.iter().copied()));
    debug!(
        survivors = survivors.len(),
        dimensions = matches.count(),
        %group_by,
        "features selected"
    );

    let mut result = FeatureIdResult {
        matches,
        intersect,
        ..FeatureIdResult::default()
    };
    match group_by {
        GroupBy::Type => {
            let mut groups = IdGroups::new();
            for f in &survivors {
                groups
                    .entry(f.feature_type().to_string())
                    .or_default()
                    .push(f.id().to_string());
            }
            result.by_type = Some(groups);
        }
        GroupBy::Region => {
            let mut groups = RegionGroups::new();
            for f in &survivors {
                for loc in f.locations() {
                    groups
                        .entry(loc.contig_id.clone())
                        .or_default()
                        .entry(loc.strand.to_string())
                        .or_default()
                        .entry(loc.range_key())
                        .or_default()
                        .push(f.id().to_string());
                }
            }
            result.by_region = Some(groups);
        }
        GroupBy::Function => {
            let mut groups = IdGroups::new();
            for f in &survivors {
                if let Some(function) = f.function() {
                    groups
                        .entry(function.to_string())
                        .or_default()
                        .push(f.id().to_string());
                }
            }
            result.by_function = Some(groups);
        }
        GroupBy::Alias => {
            let mut groups = IdGroups::new();
            for f in &survivors {
                for alias in f.alias_names().unwrap_or_default() {
                    groups
                        .entry(alias.to_string())
                        .or_default()
                        .push(f.id().to_string());
                }
            }
            result.by_alias = Some(groups);
        }
    }
    result
}

/// Reject an explicitly empty id list.
pub(crate) fn require_ids(ids: &[String], what: &str) -> ApiResult<()> {
    if ids.is_empty() {
        return Err(ApiError::InvalidArgument(format!(
            "a non-empty list of {what} ids is required"
        )));
    }
    Ok(())
}

/// `None` means every id; `Some` must be non-empty.
pub(crate) fn id_filter<'a>(
    ids: Option<&'a [String]>,
    what: &str,
) -> ApiResult<Option<BTreeSet<&'a str>>> {
    match ids {
        None => Ok(None),
        Some(ids) => {
            require_ids(ids, what)?;
            Ok(Some(ids.iter().map(String::as_str).collect()))
        }
    }
}

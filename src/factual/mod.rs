// Numeric fact checking
// Mentions of numbers with units, sanity checks and corpus outlier detection


pub mod units;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::Result;
use crate::config::Config;
use crate::database::IndexMapping;
use crate::documents::resolve_document_text;
use crate::embeddings::truncate_chars;

/// Mentions written to the report
pub const MAX_REPORTED_MENTIONS: usize = 2000;
/// Samples a unit bucket needs before its statistics are used
pub const MIN_BUCKET_SAMPLES: usize = 10;
/// Spread between the largest and smallest value of a bucket that flags it
const SCALE_SPREAD: f64 = 1000.0;

static NUMERIC_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([-+]?\d*\.?\d+)\s*([a-zA-Zµ%]*)").expect("mention pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionKind {
    Number,
}

impl MentionKind {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
        }
    }
}

/// A number found in text, with its unit converted to SI when possible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericMention {
    pub value: f64,
    pub unit: Option<String>,
    pub kind: MentionKind,
    pub si_unit: Option<String>,
    pub value_si: Option<f64>,
}

impl NumericMention {
    /// Mention with its canonical fields filled in. Without a unit the SI
    /// value is the raw value; an unknown unit leaves both fields empty.
    #[inline]
    pub fn new(value: f64, unit: Option<String>) -> Self {
        let (si_unit, value_si) = match unit.as_deref() {
            None => (None, Some(value)),
            Some(unit) => match units::to_base_units(value, unit) {
                Some(canonical) => (Some(canonical.si_unit.to_string()), Some(canonical.value)),
                None => (None, None),
            },
        };

        Self {
            value,
            unit,
            kind: MentionKind::Number,
            si_unit,
            value_si,
        }
    }

    /// Corpus statistics key, `kind::si_unit`
    #[inline]
    pub fn bucket_key(&self) -> String {
        format!(
            "{}::{}",
            self.kind.as_str(),
            self.si_unit.as_deref().unwrap_or("None")
        )
    }
}

/// Baseline of one unit bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusStatistic {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

pub type CorpusStats = BTreeMap<String, CorpusStatistic>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactualIssues {
    pub hard_checks: Vec<String>,
    pub statistical_checks: Vec<String>,
}

/// Contents of `factual.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactualReport {
    pub file: String,
    pub topic: String,
    pub num_mentions: usize,
    pub mentions: Vec<NumericMention>,
    pub issues: FactualIssues,
    pub corpus_stats_available_for: Vec<String>,
}

impl FactualReport {
    #[inline]
    pub fn issue_count(&self) -> usize {
        self.issues.hard_checks.len() + self.issues.statistical_checks.len()
    }
}

/// Every number in `text` with the unit token that follows it
#[inline]
pub fn extract_numeric_mentions(text: &str) -> Vec<NumericMention> {
    let mut mentions = Vec::new();

    for captures in NUMERIC_MENTION.captures_iter(text) {
        let captures = match captures {
            Ok(captures) => captures,
            Err(e) => {
                warn!("Numeric mention scan aborted: {}", e);
                break;
            }
        };

        let Some(value) = captures
            .get(1)
            .and_then(|m| m.as_str().parse::<f64>().ok())
        else {
            continue;
        };
        let unit = captures
            .get(2)
            .map(|m| m.as_str())
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        mentions.push(NumericMention::new(value, unit));
    }

    mentions
}

/// Decimal form of a value that always shows a fractional part, so whole
/// numbers read `150.0` rather than `150`
#[inline]
pub fn format_value(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        format!("{}.0", text)
    } else {
        text
    }
}

/// Percentages outside [0, 100]
#[inline]
pub fn sanity_checks(mentions: &[NumericMention]) -> Vec<String> {
    mentions
        .iter()
        .filter(|m| m.unit.as_deref() == Some("%") && !(0.0..=100.0).contains(&m.value))
        .map(|m| format!("Invalid percentage: {}%", format_value(m.value)))
        .collect()
}

fn values_by_unit(mentions: &[NumericMention]) -> BTreeMap<&str, Vec<f64>> {
    let mut grouped: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for mention in mentions {
        if let (Some(unit), Some(value)) = (mention.si_unit.as_deref(), mention.value_si) {
            grouped.entry(unit).or_default().push(value);
        }
    }
    grouped
}

/// SI units whose values span more than three orders of magnitude
#[inline]
pub fn internal_consistency_checks(mentions: &[NumericMention]) -> Vec<String> {
    values_by_unit(mentions)
        .into_iter()
        .filter(|(_, values)| values.len() > 1)
        .filter_map(|(unit, values)| {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (max > SCALE_SPREAD * min).then(|| {
                format!(
                    "Inconsistent scale for {}: min={}, max={}",
                    unit,
                    format_value(min),
                    format_value(max)
                )
            })
        })
        .collect()
}

/// Mentions further than `z_threshold` standard deviations from the corpus
/// mean of their bucket. Buckets without statistics or spread are skipped.
#[inline]
pub fn statistical_plausibility_checks(
    mentions: &[NumericMention],
    stats: &CorpusStats,
    z_threshold: f64,
) -> Vec<String> {
    mentions
        .iter()
        .filter_map(|mention| {
            let si_unit = mention.si_unit.as_deref()?;
            let value = mention.value_si?;
            let stat = stats.get(&mention.bucket_key())?;
            (stat.std > 0.0 && (value - stat.mean).abs() > z_threshold * stat.std).then(|| {
                format!(
                    "Outlier {} {} vs mean {}±{}",
                    format_value(value),
                    si_unit,
                    format_value(stat.mean),
                    format_value(stat.std)
                )
            })
        })
        .collect()
}

/// Aggregate per-bucket statistics over a set of texts. Buckets with fewer
/// than ten samples are dropped.
#[inline]
pub fn aggregate_statistics<'a, I>(texts: I) -> CorpusStats
where
    I: IntoIterator<Item = &'a str>,
{
    let mut samples: HashMap<String, Vec<f64>> = HashMap::new();
    for text in texts {
        for mention in extract_numeric_mentions(text) {
            if let Some(value) = mention.value_si {
                samples.entry(mention.bucket_key()).or_default().push(value);
            }
        }
    }

    samples
        .into_iter()
        .filter(|(_, values)| values.len() >= MIN_BUCKET_SAMPLES)
        .map(|(key, values)| {
            let count = values.len() as f64;
            let mean = values.iter().sum::<f64>() / count;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
            let stat = CorpusStatistic {
                count: values.len(),
                mean,
                std: variance.sqrt(),
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            };
            (key, stat)
        })
        .collect()
}

/// Statistics over the cached texts of a topic mapping. A missing mapping
/// yields no statistics.
#[inline]
pub fn corpus_stats_from_mapping(mapping_path: &Path) -> Result<CorpusStats> {
    if !mapping_path.exists() {
        warn!(
            "No topic mapping at {}, statistical checks disabled",
            mapping_path.display()
        );
        return Ok(CorpusStats::new());
    }

    let mapping = IndexMapping::load(mapping_path)?;
    let texts: Vec<String> = mapping
        .entries()
        .iter()
        .filter_map(|entry| entry.text_path.as_deref())
        .filter(|path| Path::new(path).exists())
        .filter_map(|path| match fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Skipping unreadable corpus text {}: {}", path, e);
                None
            }
        })
        .collect();

    debug!("Aggregating statistics over {} corpus texts", texts.len());
    Ok(aggregate_statistics(texts.iter().map(String::as_str)))
}

/// Check the numbers of a paper against themselves and the topic corpus
#[inline]
pub fn run_factual_check(pdf_path: &Path, topic: &str, config: &Config) -> Result<FactualReport> {
    let text = resolve_document_text(pdf_path, &config.parsed_text_dir())?;
    let text = truncate_chars(&text, config.chunking.max_document_chars);

    let mentions = extract_numeric_mentions(text);
    let mut hard_checks = sanity_checks(&mentions);
    hard_checks.extend(internal_consistency_checks(&mentions));

    let stats = corpus_stats_from_mapping(&config.topic_mapping_path(topic))?;
    let statistical_checks =
        statistical_plausibility_checks(&mentions, &stats, config.thresholds.outlier_z);

    let report = FactualReport {
        file: pdf_path.to_string_lossy().into_owned(),
        topic: topic.to_string(),
        num_mentions: mentions.len(),
        mentions: mentions.into_iter().take(MAX_REPORTED_MENTIONS).collect(),
        issues: FactualIssues {
            hard_checks,
            statistical_checks,
        },
        corpus_stats_available_for: stats.keys().cloned().collect(),
    };

    info!(
        "Found {} numeric mentions and {} issues ({} buckets with corpus statistics)",
        report.num_mentions,
        report.issue_count(),
        report.corpus_stats_available_for.len()
    );

    Ok(report)
}

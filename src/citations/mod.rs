// Reference-list analysis
// GROBID TEI parsing and citation quality metrics


pub mod grobid;

use std::fs;
use std::path::Path;

use itertools::Itertools;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::documents::document_stem;
use crate::{ReviewError, Result};
use grobid::GrobidClient;

const TEI_NS: &str = "http://www.tei-c.org/ns/1.0";

/// One entry of a paper's bibliography
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub title: Option<String>,
    pub year: Option<String>,
    pub authors: Vec<String>,
    pub doi: Option<String>,
}

impl Reference {
    /// Publication year when it is a plain run of digits
    #[inline]
    pub fn numeric_year(&self) -> Option<i32> {
        self.year
            .as_deref()
            .filter(|y| !y.is_empty() && y.chars().all(|c| c.is_ascii_digit()))
            .and_then(|y| y.parse().ok())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationAnalysis {
    pub total_references: usize,
    pub recent_percentage: f64,
    pub outdated_percentage: f64,
    pub missing_dois: usize,
    pub diversity_score: f64,
    /// 0 to 10: recency weighs 4, diversity 3, DOI completeness 3
    pub citation_quality_score: f64,
    pub outdated_references: Vec<Reference>,
}

/// Contents of `citation_report.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationReport {
    pub pdf: String,
    pub analysis: CitationAnalysis,
    pub references: Vec<Reference>,
}

fn is_tei(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(TEI_NS)
}

fn first_descendant<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants().skip(1).find(|n| is_tei(*n, name))
}

fn element_text(node: Node<'_, '_>) -> Option<String> {
    node.text().map(str::to_string)
}

/// Structured references from `listBibl/biblStruct` entries of a TEI document
#[inline]
pub fn parse_tei_references(xml: &str) -> Result<Vec<Reference>> {
    let document = Document::parse(xml)
        .map_err(|e| ReviewError::Extraction(format!("Invalid TEI XML: {}", e)))?;

    let references = document
        .descendants()
        .filter(|node| is_tei(*node, "biblStruct"))
        .filter(|node| node.parent().is_some_and(|p| is_tei(p, "listBibl")))
        .map(|bibl| {
            let authors = bibl
                .descendants()
                .filter(|n| is_tei(*n, "persName"))
                .filter(|n| n.parent().is_some_and(|p| is_tei(p, "author")))
                .map(|pers| {
                    pers.children()
                        .find(|c| is_tei(*c, "surname"))
                        .and_then(element_text)
                        .unwrap_or_default()
                })
                .collect();

            Reference {
                title: first_descendant(bibl, "title").and_then(element_text),
                year: first_descendant(bibl, "date")
                    .and_then(|d| d.attribute("when"))
                    .map(str::to_string),
                authors,
                doi: bibl
                    .descendants()
                    .find(|n| is_tei(*n, "idno") && n.attribute("type") == Some("DOI"))
                    .and_then(element_text),
            }
        })
        .collect();

    Ok(references)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Recency, diversity and DOI-completeness metrics. References published in or
/// before `year_threshold` are outdated; undated ones are neither.
#[inline]
pub fn analyze_citations(references: &[Reference], year_threshold: i32) -> CitationAnalysis {
    let total = references.len();
    if total == 0 {
        return CitationAnalysis::default();
    }

    let outdated: Vec<Reference> = references
        .iter()
        .filter(|r| r.numeric_year().is_some_and(|y| y <= year_threshold))
        .cloned()
        .collect();
    let recent = references
        .iter()
        .filter(|r| r.numeric_year().is_some_and(|y| y > year_threshold))
        .count();
    let missing_dois = references
        .iter()
        .filter(|r| r.doi.as_deref().is_none_or(str::is_empty))
        .count();
    let venues = references
        .iter()
        .filter_map(|r| r.title.as_deref().filter(|t| !t.is_empty()))
        .map(|t| t.split(':').next().unwrap_or(t))
        .unique()
        .count();

    let total_f = total as f64;
    let recent_ratio = recent as f64 / total_f;
    let diversity = venues as f64 / total_f;
    let doi_ratio = 1.0 - missing_dois as f64 / total_f;

    CitationAnalysis {
        total_references: total,
        recent_percentage: round2(recent_ratio * 100.0),
        outdated_percentage: round2(outdated.len() as f64 / total_f * 100.0),
        missing_dois,
        diversity_score: round2(diversity),
        citation_quality_score: round2(recent_ratio * 4.0 + diversity * 3.0 + doi_ratio * 3.0),
        outdated_references: outdated,
    }
}

/// Send the PDF to GROBID, keep its TEI under `references/`, and analyze the
/// reference list. A GROBID failure aborts the stage.
#[inline]
pub fn run_citation_analysis(
    pdf_path: &Path,
    config: &Config,
    client: &GrobidClient,
) -> Result<CitationReport> {
    if !pdf_path.exists() {
        return Err(ReviewError::missing("input PDF", pdf_path));
    }

    let tei = client.process_fulltext(pdf_path)?;

    let references_dir = config.references_dir();
    fs::create_dir_all(&references_dir)?;
    let tei_path = references_dir.join(format!("{}_refs.xml", document_stem(pdf_path)));
    fs::write(&tei_path, &tei)?;
    info!("References saved to {}", tei_path.display());

    let references = parse_tei_references(&tei)?;
    if references.is_empty() {
        warn!("No references found in {}", pdf_path.display());
    }

    let analysis = analyze_citations(&references, config.thresholds.citation_year_threshold);
    info!(
        "Analyzed {} references, quality score {:.2}",
        analysis.total_references, analysis.citation_quality_score
    );

    Ok(CitationReport {
        pdf: pdf_path.to_string_lossy().into_owned(),
        analysis,
        references,
    })
}

#[cfg(test)]
mod tests;

use tracing::debug;

use super::{PaperSource, SourceClient, non_blank};
use crate::documents::PaperMetadata;
use crate::embeddings::normalize_whitespace;
use crate::{ReviewError, Result};

pub const ARXIV_ENDPOINT: &str = "http://export.arxiv.org/api/query";
const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const PER_PAGE: usize = 150;

/// arXiv search over its Atom API
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: SourceClient,
}

impl ArxivSource {
    #[inline]
    pub fn new(client: SourceClient) -> Self {
        Self { client }
    }

    #[inline]
    pub fn public() -> Result<Self> {
        Ok(Self::new(SourceClient::new(ARXIV_ENDPOINT)?))
    }
}

impl PaperSource for ArxivSource {
    #[inline]
    fn name(&self) -> &str {
        "arXiv"
    }

    #[inline]
    fn search(&self, keyword: &str, max_results: usize) -> Result<Vec<PaperMetadata>> {
        let per_page = PER_PAGE.min(max_results.max(1));
        let mut papers = Vec::new();

        for start in (0..max_results).step_by(per_page) {
            if start > 0 {
                self.client.pause();
            }
            let feed = self.client.get(
                self.name(),
                &[
                    ("search_query", format!("all:{}", keyword)),
                    ("start", start.to_string()),
                    ("max_results", per_page.to_string()),
                ],
            )?;
            let page = parse_atom_feed(&feed)?;
            debug!("arXiv page at {} held {} entries", start, page.len());
            if page.is_empty() {
                break;
            }
            papers.extend(page);
        }

        papers.truncate(max_results);
        Ok(papers)
    }
}

/// Papers of an arXiv Atom feed
#[inline]
pub fn parse_atom_feed(xml: &str) -> Result<Vec<PaperMetadata>> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| ReviewError::Extraction(format!("Invalid arXiv feed: {}", e)))?;

    let papers = doc
        .descendants()
        .filter(|n| n.has_tag_name((ATOM_NS, "entry")))
        .map(|entry| {
            let child_text = |name: &str| {
                entry
                    .children()
                    .find(|c| c.has_tag_name((ATOM_NS, name)))
                    .and_then(|c| c.text())
                    .map(normalize_whitespace)
            };

            let id = child_text("id").unwrap_or_default();
            let paper_id = id.rsplit("/abs/").next().unwrap_or_default();
            let links: Vec<_> = entry
                .children()
                .filter(|c| c.has_tag_name((ATOM_NS, "link")))
                .collect();
            let link = links
                .iter()
                .find(|l| l.attribute("rel") == Some("alternate"))
                .or_else(|| links.first())
                .and_then(|l| l.attribute("href"))
                .map(str::to_string);

            PaperMetadata {
                title: non_blank(child_text("title")),
                abstract_text: non_blank(child_text("summary")),
                link: link.or_else(|| non_blank(Some(id.clone()))),
                published: non_blank(child_text("published")),
                pdf_url: (!paper_id.is_empty())
                    .then(|| format!("http://arxiv.org/pdf/{}.pdf", paper_id)),
                pdf_path: None,
                text_path: None,
            }
        })
        .collect();

    Ok(papers)
}


use serde::Deserialize;
use tracing::debug;

use super::{PaperSource, SourceClient, non_blank};
use crate::Result;
use crate::documents::PaperMetadata;

pub const SEMANTIC_SCHOLAR_ENDPOINT: &str = "https://api.semanticscholar.org/graph/v1/paper/search";
const PER_PAGE: usize = 100;
const FIELDS: &str = "title,abstract,url,openAccessPdf,publicationDate";

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<ScholarPaper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScholarPaper {
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    url: Option<String>,
    publication_date: Option<String>,
    open_access_pdf: Option<OpenAccessPdf>,
}

#[derive(Debug, Deserialize)]
struct OpenAccessPdf {
    url: Option<String>,
}

impl From<ScholarPaper> for PaperMetadata {
    #[inline]
    fn from(paper: ScholarPaper) -> Self {
        Self {
            title: non_blank(paper.title),
            abstract_text: non_blank(paper.abstract_text),
            link: non_blank(paper.url),
            published: non_blank(paper.publication_date),
            pdf_url: non_blank(paper.open_access_pdf.and_then(|pdf| pdf.url)),
            pdf_path: None,
            text_path: None,
        }
    }
}

/// Semantic Scholar graph search
#[derive(Debug, Clone)]
pub struct SemanticScholarSource {
    client: SourceClient,
}

impl SemanticScholarSource {
    #[inline]
    pub fn new(client: SourceClient) -> Self {
        Self { client }
    }

    #[inline]
    pub fn public() -> Result<Self> {
        Ok(Self::new(SourceClient::new(SEMANTIC_SCHOLAR_ENDPOINT)?))
    }
}

/// Papers of one search response page
#[inline]
pub fn parse_search_page(json: &str) -> Result<Vec<PaperMetadata>> {
    let page: SearchPage = serde_json::from_str(json)?;
    Ok(page.data.into_iter().map(PaperMetadata::from).collect())
}

impl PaperSource for SemanticScholarSource {
    #[inline]
    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    #[inline]
    fn search(&self, keyword: &str, max_results: usize) -> Result<Vec<PaperMetadata>> {
        let mut papers = Vec::new();

        for offset in (0..max_results).step_by(PER_PAGE) {
            if offset > 0 {
                self.client.pause();
            }
            let body = self.client.get(
                self.name(),
                &[
                    ("query", keyword.to_string()),
                    ("offset", offset.to_string()),
                    ("limit", PER_PAGE.to_string()),
                    ("fields", FIELDS.to_string()),
                ],
            )?;
            let page = parse_search_page(&body)?;
            debug!("Semantic Scholar page at {} held {} papers", offset, page.len());
            if page.is_empty() {
                break;
            }
            papers.extend(page);
        }

        papers.truncate(max_results);
        Ok(papers)
    }
}

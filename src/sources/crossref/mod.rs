
use serde::Deserialize;
use tracing::debug;

use super::{PaperSource, SourceClient, non_blank};
use crate::Result;
use crate::documents::PaperMetadata;

pub const CROSSREF_ENDPOINT: &str = "https://api.crossref.org/works";
const PER_PAGE: usize = 100;

#[derive(Debug, Default, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    message: WorksMessage,
}

#[derive(Debug, Default, Deserialize)]
struct WorksMessage {
    #[serde(default)]
    items: Vec<Work>,
}

#[derive(Debug, Deserialize)]
struct Work {
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
    created: Option<WorkDate>,
    #[serde(default)]
    link: Vec<WorkLink>,
}

#[derive(Debug, Deserialize)]
struct WorkDate {
    #[serde(rename = "date-time")]
    date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkLink {
    #[serde(rename = "URL")]
    url: Option<String>,
}

impl From<Work> for PaperMetadata {
    #[inline]
    fn from(work: Work) -> Self {
        Self {
            title: non_blank(Some(work.title.join(" "))),
            abstract_text: non_blank(work.abstract_text),
            link: non_blank(work.url),
            published: non_blank(work.created.and_then(|c| c.date_time)),
            pdf_url: non_blank(work.link.into_iter().next().and_then(|l| l.url)),
            pdf_path: None,
            text_path: None,
        }
    }
}

/// CrossRef works search
#[derive(Debug, Clone)]
pub struct CrossrefSource {
    client: SourceClient,
}

impl CrossrefSource {
    #[inline]
    pub fn new(client: SourceClient) -> Self {
        Self { client }
    }

    #[inline]
    pub fn public() -> Result<Self> {
        Ok(Self::new(SourceClient::new(CROSSREF_ENDPOINT)?))
    }
}

/// Works of one CrossRef response page
#[inline]
pub fn parse_works(json: &str) -> Result<Vec<PaperMetadata>> {
    let response: WorksResponse = serde_json::from_str(json)?;
    Ok(response
        .message
        .items
        .into_iter()
        .map(PaperMetadata::from)
        .collect())
}

impl PaperSource for CrossrefSource {
    #[inline]
    fn name(&self) -> &str {
        "CrossRef"
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
                    ("rows", PER_PAGE.to_string()),
                    ("offset", offset.to_string()),
                ],
            )?;
            let page = parse_works(&body)?;
            debug!("CrossRef page at {} held {} works", offset, page.len());
            if page.is_empty() {
                break;
            }
            papers.extend(page);
        }

        papers.truncate(max_results);
        Ok(papers)
    }
}

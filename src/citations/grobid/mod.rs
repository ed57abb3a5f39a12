#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};
use url::Url;

use crate::config::GrobidConfig;
use crate::{ReviewError, Result};

const SERVICE: &str = "GROBID";
const BOUNDARY: &str = "----paper-review-grobid-boundary";
const ERROR_BODY_CHARS: usize = 200;

/// Client for a GROBID document-understanding server
#[derive(Debug, Clone)]
pub struct GrobidClient {
    base_url: Url,
    agent: ureq::Agent,
}

impl GrobidClient {
    #[inline]
    pub fn new(config: &GrobidConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| ReviewError::Config(format!("Invalid GROBID URL {}: {}", config.url, e)))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self { base_url, agent })
    }

    /// Full-text TEI of a PDF with header and citation consolidation
    #[inline]
    pub fn process_fulltext(&self, pdf_path: &Path) -> Result<String> {
        self.post_pdf(
            "/api/processFulltextDocument",
            pdf_path,
            &[("consolidateHeader", "1"), ("consolidateCitations", "1")],
        )
    }

    /// TEI of the reference list only
    #[inline]
    pub fn process_references(&self, pdf_path: &Path) -> Result<String> {
        self.post_pdf("/api/processReferences", pdf_path, &[])
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.base_url
            .join("/api/isalive")
            .ok()
            .and_then(|url| self.agent.get(url.as_str()).call().ok())
            .is_some_and(|resp| resp.status().is_success())
    }

    fn post_pdf(&self, endpoint: &str, pdf_path: &Path, fields: &[(&str, &str)]) -> Result<String> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| ReviewError::Config(format!("Invalid GROBID endpoint: {}", e)))?;

        let pdf = fs::read(pdf_path)?;
        let file_name = pdf_path
            .file_name()
            .map_or_else(|| "input.pdf".to_string(), |n| n.to_string_lossy().into_owned());
        let body = multipart_body(&file_name, &pdf, fields);

        info!("Sending {} to GROBID at {}", pdf_path.display(), url);

        let mut response = self
            .agent
            .post(url.as_str())
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .send(&body[..])
            .map_err(|e| external(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| external(format!("Failed to read response: {}", e)))?;

        if status != 200 {
            let preview: String = text.chars().take(ERROR_BODY_CHARS).collect();
            return Err(external(format!("GROBID error {}: {}", status, preview)));
        }

        debug!("GROBID returned {} bytes of TEI", text.len());
        Ok(text)
    }
}

fn external(message: String) -> ReviewError {
    ReviewError::ExternalService {
        service: SERVICE.to_string(),
        message,
    }
}

/// Encode a `multipart/form-data` body with the PDF as the `input` part
fn multipart_body(file_name: &str, pdf: &[u8], fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::with_capacity(pdf.len() + 512);

    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"input\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
            file_name.replace('"', "")
        )
        .as_bytes(),
    );
    body.extend_from_slice(pdf);
    body.extend_from_slice(b"\r\n");

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                name, value
            )
            .as_bytes(),
        );
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

//! Document loaders: input producers that sit outside the pipeline core.
//!
//! A loader turns a source (file path or URL) into an ordered list of [Document]s with
//! source metadata attached. Web crawling here is deliberately minimal; for anything
//! beyond fetching one page and stripping its markup, reach for a dedicated crawler.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::utils::JsonMap;

/// A piece of text with associated metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    pub metadata: JsonMap,
}

impl Document {
    pub fn new(page_content: impl Into<String>, metadata: JsonMap) -> Self {
        Self {
            page_content: page_content.into(),
            metadata,
        }
    }

    /// Drop metadata entries whose values are null or empty strings.
    pub fn scrub_metadata(mut self) -> Self {
        self.metadata.retain(|_, value| match value {
            serde_json::Value::Null => false,
            serde_json::Value::String(string) => !string.is_empty(),
            _ => true,
        });
        self
    }
}

/// Trait for loading documents from a local source.
pub trait Load {
    fn load(&self) -> Result<Vec<Document>>;
}

/// Trait for loading documents from a remote source.
#[async_trait]
pub trait AsyncLoad {
    async fn load(&self) -> Result<Vec<Document>>;
}

/// Loads one plain-text file as a single document.
pub struct TextLoader {
    pub path: PathBuf,
}

impl TextLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Load for TextLoader {
    fn load(&self) -> Result<Vec<Document>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read text file {}", self.path.display()))?;
        let mut metadata = JsonMap::new();
        metadata.insert("source".to_string(), json!(self.path.display().to_string()));
        Ok(vec![Document::new(content, metadata)])
    }
}

/// Loads a PDF file as one document per page.
pub struct PdfLoader {
    pub path: PathBuf,
}

impl PdfLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Load for PdfLoader {
    fn load(&self) -> Result<Vec<Document>> {
        let pdf = lopdf::Document::load(&self.path)
            .with_context(|| format!("failed to open PDF {}", self.path.display()))?;
        let mut documents = Vec::new();
        for (page_number, _object_id) in pdf.get_pages() {
            let text = pdf
                .extract_text(&[page_number])
                .with_context(|| format!("failed to extract text from page {}", page_number))?;
            let mut metadata = JsonMap::new();
            metadata.insert("source".to_string(), json!(self.path.display().to_string()));
            metadata.insert("page".to_string(), json!(page_number));
            documents.push(Document::new(text, metadata));
        }
        Ok(documents)
    }
}

/// Fetches one web page and strips its markup down to text.
pub struct WebLoader {
    pub url: Url,
}

impl WebLoader {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

#[async_trait]
impl AsyncLoad for WebLoader {
    async fn load(&self) -> Result<Vec<Document>> {
        let body = reqwest::get(self.url.as_str())
            .await
            .with_context(|| format!("failed to fetch {}", self.url))?
            .error_for_status()?
            .text()
            .await?;
        let mut metadata = JsonMap::new();
        metadata.insert("source".to_string(), json!(self.url.to_string()));
        Ok(vec![Document::new(html_to_text(&body), metadata)])
    }
}

lazy_static! {
    static ref SCRIPT_RE: Regex = Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap();
    static ref STYLE_RE: Regex = Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"(?s)<[^>]+>").unwrap();
}

/// Strip HTML down to its visible text, one line per block of content.
pub(crate) fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let without_styles = STYLE_RE.replace_all(&without_scripts, " ");
    let without_tags = TAG_RE.replace_all(&without_styles, "\n");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    decoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod test_loaders {
    use std::env;
    use std::fs;

    use serde_json::json;

    use super::{html_to_text, Document, Load, TextLoader};
    use crate::utils::JsonMap;

    #[test]
    fn test_html_to_text_strips_markup() {
        let html = r#"<html><head><style>body { color: red; }</style>
            <script type="text/javascript">var x = "<ignored>";</script></head>
            <body><h1>Rust&nbsp;rocks</h1><p>First paragraph</p></body></html>"#;
        let text = html_to_text(html);
        assert_eq!(text, "Rust rocks\nFirst paragraph");
    }

    #[test]
    fn test_text_loader_attaches_source_metadata() {
        let path = env::temp_dir().join("promptpipe_text_loader_test.txt");
        fs::write(&path, "hello from a file").unwrap();

        let documents = TextLoader::new(&path).load().unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].page_content, "hello from a file");
        assert_eq!(
            documents[0].metadata.get("source").unwrap(),
            &json!(path.display().to_string())
        );
    }

    #[test]
    fn test_scrub_metadata_drops_empty_values() {
        let mut metadata = JsonMap::new();
        metadata.insert("source".to_string(), json!("somewhere"));
        metadata.insert("title".to_string(), json!(""));
        metadata.insert("author".to_string(), json!(null));
        metadata.insert("page".to_string(), json!(3));

        let document = Document::new("content", metadata).scrub_metadata();
        assert_eq!(document.metadata.len(), 2);
        assert!(document.metadata.contains_key("source"));
        assert!(document.metadata.contains_key("page"));
    }
}

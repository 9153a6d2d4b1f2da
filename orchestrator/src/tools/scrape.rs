// Page scraping: fetch a URL and reduce the HTML to readable text

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::ToolError;

pub struct PageScraper {
    client: reqwest::Client,
}

impl PageScraper {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn scrape(&self, url: &str) -> Result<String, ToolError> {
        debug!(url, "Scraping page");
        let res = self.client.get(url).send().await?;
        if !res.status().is_success() {
            return Err(ToolError::Status(res.status().as_u16()));
        }
        let html = res.text().await?;
        Ok(html_to_text(&html))
    }
}

struct Patterns {
    hidden: Regex,
    tags: Regex,
    space: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        hidden: Regex::new(r"(?is)<script\b.*?</script>|<style\b.*?</style>|<!--.*?-->")
            .expect("static regex"),
        tags: Regex::new(r"(?s)<[^>]*>").expect("static regex"),
        space: Regex::new(r"\s+").expect("static regex"),
    })
}

/// Drops scripts, styles, comments and markup; decodes the common entities.
pub fn html_to_text(html: &str) -> String {
    let p = patterns();
    let text = p.hidden.replace_all(html, " ");
    let text = p.tags.replace_all(&text, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    p.space.replace_all(&text, " ").trim().to_string()
}

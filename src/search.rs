//! Web search used to give the reasoning step some context about an event.
//!
//! A failed search never aborts a run: [`summarize_search`] turns it into a
//! placeholder summary that names the event.

use crate::config::SearchConfig;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

static RESULT_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<a\b([^>]*)class="result__a"([^>]*)>(.*?)</a>"#).unwrap()
});
static RESULT_SNIPPET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)class="result__snippet"[^>]*>(.*?)</(?:a|div|td)>"#).unwrap()
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").unwrap());
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("search service returned HTTP {status}")]
    Status { status: u16 },
}

pub trait SearchProvider {
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}

/// DuckDuckGo web search through its HTML results page, ranked as shown.
#[derive(Debug, Clone)]
pub struct DuckDuckGoClient {
    client: Client,
    endpoint: String,
}

impl DuckDuckGoClient {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("bpe/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl SearchProvider for DuckDuckGoClient {
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        debug!(query, max_results, "querying search service");
        let response = self.client.post(&self.endpoint).form(&[("q", query)]).send()?;
        let status = response.status();
        // 202 is the rate-limit page, which has no results in it.
        if status != StatusCode::OK {
            return Err(SearchError::Status {
                status: status.as_u16(),
            });
        }
        let page = response.text()?;
        Ok(parse_results_page(&page, max_results))
    }
}

/// Organic results from a DuckDuckGo HTML results page, ads skipped.
pub fn parse_results_page(page: &str, max_results: usize) -> Vec<SearchHit> {
    let titles: Vec<Captures<'_>> = RESULT_TITLE_RE.captures_iter(page).collect();
    let mut hits = Vec::new();
    for (idx, title) in titles.iter().enumerate() {
        if hits.len() >= max_results {
            break;
        }
        let attrs = format!("{}{}", &title[1], &title[2]);
        if attrs.contains("y.js") || attrs.contains("ad_domain") {
            continue;
        }
        let Some(whole) = title.get(0) else {
            continue;
        };
        let section_end = titles
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map_or(page.len(), |next| next.start());
        let section = &page[whole.end()..section_end];
        let body = RESULT_SNIPPET_RE
            .captures(section)
            .map(|snippet| html_text(&snippet[1]))
            .unwrap_or_default();
        let hit = SearchHit {
            title: html_text(&title[3]),
            body,
        };
        if hit.title.is_empty() && hit.body.is_empty() {
            continue;
        }
        hits.push(hit);
    }
    hits
}

/// Markup stripped, entities decoded and whitespace collapsed.
fn html_text(fragment: &str) -> String {
    let text = TAG_RE.replace_all(fragment, "");
    let text = ENTITY_RE.replace_all(&text, |caps: &Captures<'_>| {
        decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });
    SPACE_RE.replace_all(text.trim(), " ").into_owned()
}

fn decode_entity(name: &str) -> Option<String> {
    let decoded = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)?
        }
    };
    Some(decoded.to_string())
}

pub fn placeholder_summary(event: &str) -> String {
    format!("Search timed out or failed; using the event text as context. Event: {event}")
}

pub fn format_hits(event: &str, hits: &[SearchHit]) -> String {
    let lines: Vec<String> = hits
        .iter()
        .filter(|hit| !hit.title.is_empty() || !hit.body.is_empty())
        .map(|hit| format!("- {}\n  {}", hit.title, hit.body))
        .collect();
    if lines.is_empty() {
        format!("No search results for: {event}")
    } else {
        lines.join("\n")
    }
}

/// Searches for `event` and renders the hits as prompt context. Failures
/// degrade to [`placeholder_summary`].
pub fn summarize_search<S: SearchProvider + ?Sized>(
    provider: &S,
    event: &str,
    max_results: usize,
) -> String {
    match provider.search(event, max_results) {
        Ok(hits) => {
            info!(hits = hits.len(), "search finished");
            format_hits(event, &hits)
        }
        Err(err) => {
            warn!(error = %err, "search unavailable, continuing with placeholder");
            placeholder_summary(event)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSearch(Vec<SearchHit>);

    impl SearchProvider for FixedSearch {
        fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
            Ok(self.0.iter().take(max_results).cloned().collect())
        }
    }

    struct DownSearch;

    impl SearchProvider for DownSearch {
        fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
            Err(SearchError::Status { status: 503 })
        }
    }

    fn hit(title: &str, body: &str) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn formats_hits_and_skips_empty_ones() {
        let provider = FixedSearch(vec![hit("Solarpunk", "An art movement"), hit("", ""), hit("", "body only")]);
        let summary = summarize_search(&provider, "solarpunk", 5);
        assert_eq!(summary, "- Solarpunk\n  An art movement\n- \n  body only");
    }

    #[test]
    fn empty_results_have_their_own_summary() {
        let summary = summarize_search(&FixedSearch(vec![]), "quiet quitting", 5);
        assert_eq!(summary, "No search results for: quiet quitting");
    }

    #[test]
    fn failure_degrades_to_placeholder() {
        let summary = summarize_search(&DownSearch, "lying flat", 5);
        assert_eq!(summary, placeholder_summary("lying flat"));
        assert!(summary.contains("lying flat"));
    }

    const RESULTS_PAGE: &str = r#"
<div class="result results_links results_links_deep result--ad">
  <h2 class="result__title"><a rel="nofollow" class="result__a" href="https://duckduckgo.com/y.js?ad_provider=x">Buy <b>solar</b> panels</a></h2>
  <a class="result__snippet" href="https://duckduckgo.com/y.js?ad_provider=x">Sponsored</a>
</div>
<div class="result results_links results_links_deep web-result">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fen.wikipedia.org%2Fwiki%2FSolarpunk">
      <b>Solarpunk</b> - Wikipedia
    </a>
  </h2>
  <a class="result__snippet" href="//duckduckgo.com/l/?uddg=x"><b>Solarpunk</b> is a literary &amp; art movement that envisions&#x27;sustainable&#39; futures.</a>
</div>
<div class="result results_links results_links_deep web-result">
  <h2 class="result__title"><a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=y">Hopepunk &#8212; a genre</a></h2>
</div>
<div class="result results_links results_links_deep web-result">
  <h2 class="result__title"><a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=z">Eco art</a></h2>
  <a class="result__snippet" href="//duckduckgo.com/l/?uddg=z">Environmental art</a>
</div>
"#;

    #[test]
    fn parses_organic_results_and_skips_ads() {
        let hits = parse_results_page(RESULTS_PAGE, 5);
        assert_eq!(
            hits,
            vec![
                hit(
                    "Solarpunk - Wikipedia",
                    "Solarpunk is a literary & art movement that envisions'sustainable' futures."
                ),
                hit("Hopepunk \u{2014} a genre", ""),
                hit("Eco art", "Environmental art"),
            ]
        );
    }

    #[test]
    fn result_limit_is_respected() {
        let hits = parse_results_page(RESULTS_PAGE, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].body, "");
    }

    #[test]
    fn pages_without_results_yield_nothing() {
        assert!(parse_results_page("<html><body>No results.</body></html>", 5).is_empty());
        assert!(parse_results_page("", 5).is_empty());
    }

    #[test]
    fn unknown_entities_are_kept_verbatim() {
        assert_eq!(html_text("a &bogus; b&#xZZ;"), "a &bogus; b&#xZZ;");
        assert_eq!(html_text(" <i>x</i>\n\t y "), "x y");
    }
}

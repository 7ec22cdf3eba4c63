//! Quotes scraped from a screenplay site's front page.
use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use reqwest::{Client, StatusCode, Url};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::QuoteProvider;
use crate::model::{Quote, QuoteMode};

const REF_PREFIX: &str = "ds";
const MIN_CHARS: usize = 26;
const MAX_CHARS: usize = 279;

static BLOCKQUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<blockquote[^>]*>(.*?)</blockquote>").expect("valid regex"));
static QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["“]([^“”"\n]{20,240})["”]"#).expect("valid regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone)]
pub struct ScriptSiteProvider {
    http: Client,
    url: Url,
}

enum FetchFailure {
    Status(StatusCode),
    Transport(reqwest::Error),
}

impl ScriptSiteProvider {
    pub fn new(http: Client, url: Url) -> Self {
        Self { http, url }
    }

    async fn fetch_page(&self) -> Result<String, FetchFailure> {
        let res = self
            .http
            .get(self.url.clone())
            .header("Cache-Control", "no-store")
            .send()
            .await
            .map_err(FetchFailure::Transport)?;
        if !res.status().is_success() {
            return Err(FetchFailure::Status(res.status()));
        }
        res.text().await.map_err(FetchFailure::Transport)
    }
}

#[async_trait]
impl QuoteProvider for ScriptSiteProvider {
    fn mode(&self) -> QuoteMode {
        QuoteMode::DailyScript
    }

    async fn next_quote(&self, last_quote_ref: Option<&str>) -> Quote {
        match self.fetch_page().await {
            Ok(html) => {
                let quotes = parse_quotes_from_html(&html);
                debug!(count = quotes.len(), "extracted script site quotes");
                pick_quote(&quotes, last_quote_ref, &mut rand::thread_rng())
            }
            Err(FetchFailure::Status(status)) => {
                warn!(%status, url = %self.url, "script site returned an error status");
                Quote::new(
                    format!(
                        "DailyScript request failed with status {}.",
                        status.as_u16()
                    ),
                    format!("{REF_PREFIX}-http-failure"),
                )
            }
            Err(FetchFailure::Transport(err)) => {
                warn!(?err, url = %self.url, "script site unreachable");
                Quote::new(
                    "DailyScript is temporarily unavailable.",
                    format!("{REF_PREFIX}-fetch-failure"),
                )
            }
        }
    }
}

/// Decode the handful of entities the site uses and collapse whitespace.
pub fn decode_html_entities(input: &str) -> String {
    let decoded = input
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    WHITESPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

pub fn strip_html(input: &str) -> String {
    decode_html_entities(&TAG_RE.replace_all(input, " "))
}

fn within_length_window(text: &str) -> bool {
    let len = text.chars().count();
    (MIN_CHARS..=MAX_CHARS).contains(&len)
}

/// Extract quote-like spans from blockquotes and quotation marks.
///
/// Results keep first-seen order with duplicates removed; each ref is the
/// position in this list, so refs are only meaningful for a single fetch.
pub fn parse_quotes_from_html(html: &str) -> Vec<Quote> {
    let mut seen = HashSet::new();
    let mut texts = Vec::new();
    let mut push = |text: String| {
        if within_length_window(&text) && seen.insert(text.clone()) {
            texts.push(text);
        }
    };

    for caps in BLOCKQUOTE_RE.captures_iter(html) {
        push(strip_html(&caps[1]));
    }
    for caps in QUOTED_RE.captures_iter(html) {
        push(decode_html_entities(&caps[1]));
    }

    texts
        .into_iter()
        .enumerate()
        .map(|(idx, text)| Quote::new(text, format!("{REF_PREFIX}-{idx}")))
        .collect()
}

pub fn pick_quote<R: Rng + ?Sized>(
    quotes: &[Quote],
    last_quote_ref: Option<&str>,
    rng: &mut R,
) -> Quote {
    let Some(first) = quotes.first() else {
        return Quote::new(
            "No quote found on DailyScript right now.",
            format!("{REF_PREFIX}-fallback"),
        );
    };

    let last_quote_ref = match last_quote_ref {
        Some(r) if quotes.len() > 1 => r,
        _ => return quotes.choose(rng).unwrap_or(first).clone(),
    };

    let options: Vec<&Quote> = quotes
        .iter()
        .filter(|q| q.quote_ref != last_quote_ref)
        .collect();
    if options.is_empty() {
        return quotes.choose(rng).unwrap_or(first).clone();
    }
    options.choose(rng).copied().unwrap_or(first).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::Router;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const PAGE: &str = r#"
        <html><body>
          <blockquote class="q"><p>I&#39;m gonna make him an offer he can&#39;t refuse.</p></blockquote>
          <blockquote>Too short.</blockquote>
          <p>As someone once said, "Here&#39;s looking at you, kid, said Rick at the bar" tonight.</p>
          <p>“Frankly, my dear, I don't give a damn about any of it.”</p>
          <blockquote>Frankly, my dear, I don't give a damn about any of it.</blockquote>
        </body></html>
    "#;

    async fn serve(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    #[test]
    fn decode_entities_and_collapse_whitespace() {
        assert_eq!(
            decode_html_entities("  Tom &amp; Jerry&nbsp;&lt;3 \n\t &quot;ok&quot; "),
            "Tom & Jerry <3 \"ok\""
        );
        assert_eq!(strip_html("<b>bold</b><i>italic</i>"), "bold italic");
    }

    #[test]
    fn parse_extracts_blockquotes_and_quoted_spans() {
        let quotes = parse_quotes_from_html(PAGE);
        let texts: Vec<&str> = quotes.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "I'm gonna make him an offer he can't refuse.",
                "Frankly, my dear, I don't give a damn about any of it.",
                "Here's looking at you, kid, said Rick at the bar",
            ]
        );
        let refs: Vec<&str> = quotes.iter().map(|q| q.quote_ref.as_str()).collect();
        assert_eq!(refs, vec!["ds-0", "ds-1", "ds-2"]);
    }

    #[test]
    fn parse_applies_length_window() {
        let exactly_min = "a".repeat(MIN_CHARS);
        let too_long = "b".repeat(MAX_CHARS + 1);
        let html = format!(
            "<blockquote>{}</blockquote><blockquote>{}</blockquote><blockquote>{}</blockquote>",
            "c".repeat(MIN_CHARS - 1),
            exactly_min,
            too_long
        );
        let quotes = parse_quotes_from_html(&html);
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].text, exactly_min);
    }

    #[test]
    fn pick_returns_fallback_for_empty_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let quote = pick_quote(&[], Some("ds-0"), &mut rng);
        assert_eq!(quote.quote_ref, "ds-fallback");
    }

    #[test]
    fn pick_never_repeats_previous_ref_when_alternatives_exist() {
        let quotes = parse_quotes_from_html(PAGE);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let quote = pick_quote(&quotes, Some("ds-1"), &mut rng);
            assert_ne!(quote.quote_ref, "ds-1");
        }
    }

    #[test]
    fn pick_single_quote_repeats_when_no_alternative() {
        let quotes = vec![Quote::new("only one quote that is long enough", "ds-0")];
        let mut rng = StdRng::seed_from_u64(3);
        let quote = pick_quote(&quotes, Some("ds-0"), &mut rng);
        assert_eq!(quote.quote_ref, "ds-0");
    }

    #[tokio::test]
    async fn fetches_and_picks_from_live_page() {
        let url = serve(Router::new().route("/", get(|| async { PAGE }))).await;
        let provider = ScriptSiteProvider::new(Client::new(), url);
        let quote = provider.next_quote(Some("ds-0")).await;
        assert!(quote.quote_ref == "ds-1" || quote.quote_ref == "ds-2");
    }

    #[tokio::test]
    async fn http_error_becomes_labeled_fallback() {
        let url = serve(Router::new().route(
            "/",
            get(|| async { (AxumStatus::SERVICE_UNAVAILABLE, "down") }),
        ))
        .await;
        let provider = ScriptSiteProvider::new(Client::new(), url);
        let quote = provider.next_quote(None).await;
        assert_eq!(quote.quote_ref, "ds-http-failure");
        assert!(quote.text.contains("503"));
    }

    #[tokio::test]
    async fn transport_error_becomes_labeled_fallback() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        let provider = ScriptSiteProvider::new(Client::new(), url);
        let quote = provider.next_quote(None).await;
        assert_eq!(quote.quote_ref, "ds-fetch-failure");
    }
}

//! Quotes from a static JSON array of show quotes.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, warn};

use super::QuoteProvider;
use crate::delivery::truncate_chars;
use crate::model::{Quote, QuoteMode};

const REF_PREFIX: &str = "rm";
const LOCAL_REF_PREFIX: &str = "rm-local";

pub const LOCAL_FALLBACK_QUOTES: [&str; 3] = [
    "Wubba Lubba Dub Dub! -Rick",
    "Sometimes science is more art than science. -Rick",
    "Nobody exists on purpose. Nobody belongs anywhere. Everybody's gonna die. -Morty",
];

#[derive(Debug, Clone)]
pub struct JsonQuotesProvider {
    http: Client,
    url: Url,
    max_chars: usize,
}

impl JsonQuotesProvider {
    pub fn new(http: Client, url: Url, max_chars: usize) -> Self {
        Self {
            http,
            url,
            max_chars,
        }
    }

    async fn fetch_quotes(&self) -> Result<Vec<String>> {
        let res = self
            .http
            .get(self.url.clone())
            .header("Cache-Control", "no-store")
            .send()
            .await
            .context("failed to reach JSON quote source")?;
        if !res.status().is_success() {
            return Err(anyhow!("JSON quote source returned {}", res.status()));
        }
        let payload: Value = res
            .json()
            .await
            .context("invalid JSON from quote source")?;
        Ok(normalize_payload(&payload))
    }
}

#[async_trait]
impl QuoteProvider for JsonQuotesProvider {
    fn mode(&self) -> QuoteMode {
        QuoteMode::RickMorty
    }

    async fn next_quote(&self, last_quote_ref: Option<&str>) -> Quote {
        let remote = match self.fetch_quotes().await {
            Ok(quotes) => quotes,
            Err(err) => {
                warn!(?err, url = %self.url, "using local fallback quotes");
                Vec::new()
            }
        };

        let mut rng = rand::thread_rng();
        if let Some(quote) = select(&remote, REF_PREFIX, last_quote_ref, self.max_chars, &mut rng) {
            return quote;
        }
        if !remote.is_empty() {
            debug!(
                count = remote.len(),
                max_chars = self.max_chars,
                "no remote quote fits the display"
            );
        }

        let local: Vec<String> = LOCAL_FALLBACK_QUOTES.iter().map(|q| q.to_string()).collect();
        select(&local, LOCAL_REF_PREFIX, last_quote_ref, self.max_chars, &mut rng).unwrap_or_else(
            || {
                let all: Vec<usize> = (0..local.len()).collect();
                let previous = parse_previous_index(last_quote_ref, LOCAL_REF_PREFIX);
                let idx = pick_non_repeating_index(&all, previous, &mut rng);
                Quote::new(
                    truncate_chars(&local[idx], self.max_chars),
                    format!("{LOCAL_REF_PREFIX}-{idx}"),
                )
            },
        )
    }
}

/// Turn one record into display text: a bare string, or `{quote, character?}`
/// with the character appended as attribution.
pub fn normalize_record(record: &Value) -> Option<String> {
    match record {
        Value::String(s) => {
            let text = s.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        Value::Object(map) => {
            let quote = map.get("quote")?.as_str()?.trim();
            if quote.is_empty() {
                return None;
            }
            let character = map
                .get("character")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|c| !c.is_empty());
            Some(match character {
                Some(character) => format!("{quote} -{character}"),
                None => quote.to_string(),
            })
        }
        _ => None,
    }
}

pub fn normalize_payload(payload: &Value) -> Vec<String> {
    payload
        .as_array()
        .map(|items| items.iter().filter_map(normalize_record).collect())
        .unwrap_or_default()
}

/// Recover the list index from a ref in the given namespace (`rm-4` → 4).
pub fn parse_previous_index(last_quote_ref: Option<&str>, prefix: &str) -> Option<usize> {
    last_quote_ref?
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .parse()
        .ok()
}

/// Pick one of `candidates` (list indices) at random; when it lands on the
/// previous index, step to the next candidate instead.
pub fn pick_non_repeating_index<R: Rng + ?Sized>(
    candidates: &[usize],
    previous: Option<usize>,
    rng: &mut R,
) -> usize {
    match candidates.len() {
        0 => 0,
        1 => candidates[0],
        len => {
            let mut pos = rng.gen_range(0..len);
            if Some(candidates[pos]) == previous {
                pos = (pos + 1) % len;
            }
            candidates[pos]
        }
    }
}

fn select<R: Rng + ?Sized>(
    list: &[String],
    prefix: &str,
    last_quote_ref: Option<&str>,
    max_chars: usize,
    rng: &mut R,
) -> Option<Quote> {
    let candidates: Vec<usize> = list
        .iter()
        .enumerate()
        .filter(|(_, text)| text.chars().count() <= max_chars)
        .map(|(idx, _)| idx)
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let previous = parse_previous_index(last_quote_ref, prefix);
    let idx = pick_non_repeating_index(&candidates, previous, rng);
    Some(Quote::new(list[idx].clone(), format!("{prefix}-{idx}")))
}

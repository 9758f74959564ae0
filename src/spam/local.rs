//! Spam detection against a local corpus of known spam messages.

use crate::bot::Message;
use crate::spam::{OracleError, SpamOracle, Verdict};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

type Tokens = HashMap<String, usize>;

#[derive(Debug, Clone, Copy)]
pub struct LocalOracleParams {
    /// Cosine similarity at or above which a message counts as spam.
    pub similarity_threshold: f64,
    /// More emoji than this marks a message as spam. Zero disables the rule.
    pub max_emoji: usize,
}

impl Default for LocalOracleParams {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.5,
            max_emoji: 2,
        }
    }
}

pub struct LocalOracle {
    params: LocalOracleParams,
    samples: Vec<Tokens>,
    stop_words: Vec<String>,
}

/// Reads non-empty, trimmed lines from a file.
pub fn load_lines(path: &Path) -> Result<Vec<String>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("can't read {}", path.display()))?;
    Ok(data
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn tokenize(text: &str) -> Tokens {
    let mut tokens = Tokens::new();
    for word in text.split_whitespace() {
        *tokens.entry(word.to_lowercase()).or_default() += 1;
    }
    tokens
}

/// Cosine similarity of two token-frequency vectors.
fn similarity(a: &Tokens, b: &Tokens) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .filter_map(|(w, ca)| b.get(w).map(|cb| (*ca * *cb) as f64))
        .sum();
    let norm = |t: &Tokens| t.values().map(|c| (*c * *c) as f64).sum::<f64>().sqrt();
    dot / (norm(a) * norm(b))
}

fn is_emoji(c: char) -> bool {
    let code = c as u32;
    (0x1F600..=0x1F64F).contains(&code) // emoticons
        || (0x1F300..=0x1F5FF).contains(&code) // misc symbols and pictographs
        || (0x1F680..=0x1F6FF).contains(&code) // transport
        || (0x1F900..=0x1F9FF).contains(&code) // supplemental symbols
        || (0x2600..=0x26FF).contains(&code) // misc symbols
        || (0x2700..=0x27BF).contains(&code) // dingbats
}

fn count_emoji(text: &str) -> usize {
    text.chars().filter(|c| is_emoji(*c)).count()
}

impl LocalOracle {
    pub fn new(samples: &[String], stop_words: &[String], params: LocalOracleParams) -> Self {
        Self {
            params,
            samples: samples.iter().map(|s| tokenize(s)).collect(),
            stop_words: stop_words.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// Loads the spam corpus and optional stop phrases, one entry per line.
    pub fn from_files(
        samples: &Path,
        stop_words: Option<&Path>,
        params: LocalOracleParams,
    ) -> Result<Self> {
        let samples = load_lines(samples)?;
        let stop_words = match stop_words {
            Some(path) => load_lines(path)?,
            None => Vec::new(),
        };
        log::info!(
            "loaded {} spam samples and {} stop phrases",
            samples.len(),
            stop_words.len()
        );
        Ok(Self::new(&samples, &stop_words, params))
    }

    /// Evaluates text without the filter policy around it.
    pub fn verdict(&self, text: &str) -> Verdict {
        let lower = text.to_lowercase();
        if let Some(phrase) = self.stop_words.iter().find(|w| lower.contains(w.as_str())) {
            return Verdict::Spam(format!("stop phrase \"{}\"", phrase));
        }

        let emoji = count_emoji(text);
        if self.params.max_emoji > 0 && emoji > self.params.max_emoji {
            return Verdict::Spam(format!("too many emoji ({})", emoji));
        }

        let tokens = tokenize(text);
        let best = self
            .samples
            .iter()
            .map(|s| similarity(&tokens, s))
            .fold(0.0_f64, f64::max);
        if best >= self.params.similarity_threshold {
            return Verdict::Spam(format!("similarity {:.2} to known spam", best));
        }
        Verdict::Ham
    }
}

#[async_trait]
impl SpamOracle for LocalOracle {
    fn name(&self) -> &str {
        "local"
    }

    async fn check(&self, msg: &Message) -> Result<Verdict, OracleError> {
        Ok(self.verdict(&msg.text))
    }
}

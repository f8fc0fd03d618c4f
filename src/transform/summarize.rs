//! Summarisation backends.
//!
//! - [`summarize_local`]: extractive, in-process and deterministic. Sentences
//!   are scored by the corpus frequency of their character bigrams, which
//!   works the same for spaced and unspaced scripts.
//! - [`summarize_remote`]: asks the generative service and clips the answer.
//!
//! Both cut the input to `max_input_chars` first.

use crate::api::AskAsync;
use crate::config::SummarizeOptions;
use crate::error::{Error, Result};
use crate::utils::{clip_with_ellipsis, truncate_chars};
use std::collections::HashMap;
use tracing::debug;

const FULL_STOPS: [char; 6] = ['。', '．', '！', '？', '!', '?'];

/// Split text into trimmed, non-empty sentences.
///
/// Boundaries are newlines, CJK full stops, `!`, `?`, and `.` when followed
/// by whitespace or the end of text.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let end = idx + c.len_utf8();
        let boundary = c == '\n'
            || FULL_STOPS.contains(&c)
            || (c == '.' && chars.peek().is_none_or(|(_, next)| next.is_whitespace()));
        if boundary {
            let s = text[start..end].trim();
            if !s.is_empty() {
                sentences.push(s);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn bigrams(s: &str) -> Vec<(char, char)> {
    let chars: Vec<char> = s
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

fn joiner(prev: &str) -> &'static str {
    match prev.chars().last() {
        Some(c) if c.is_ascii() => " ",
        _ => "",
    }
}

/// Extractive summary of `text` within `opts.min_chars..=opts.max_chars`
/// characters where the input allows.
///
/// The highest-scoring sentences that fit whole are kept in page order. When
/// they fall short of `min_chars`, the next-best sentence is clipped with an
/// ellipsis into the room that is left.
///
/// # Errors
///
/// [`Error::Generation`] when there is no text to summarise.
pub fn summarize_local(text: &str, opts: &SummarizeOptions) -> Result<String> {
    let input = truncate_chars(text, opts.max_input_chars).trim();
    if input.is_empty() {
        return Err(Error::Generation("nothing to summarise".to_string()));
    }
    if input.chars().count() <= opts.max_chars {
        return Ok(input.to_string());
    }

    let sentences = split_sentences(input);
    if sentences.len() <= 1 {
        return Ok(clip_with_ellipsis(input, opts.max_chars));
    }

    let mut freq: HashMap<(char, char), usize> = HashMap::new();
    let per_sentence: Vec<Vec<(char, char)>> = sentences.iter().map(|s| bigrams(s)).collect();
    for grams in &per_sentence {
        for g in grams {
            *freq.entry(*g).or_default() += 1;
        }
    }

    let scores: Vec<f64> = per_sentence
        .iter()
        .map(|grams| {
            if grams.is_empty() {
                0.0
            } else {
                grams.iter().map(|g| freq[g] as f64).sum::<f64>() / grams.len() as f64
            }
        })
        .collect();

    let mut ranking: Vec<usize> = (0..sentences.len()).collect();
    ranking.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

    let mut chosen: Vec<usize> = Vec::new();
    let mut used = 0usize;
    for idx in ranking.iter().copied() {
        let len = sentences[idx].chars().count() + usize::from(!chosen.is_empty());
        if used + len <= opts.max_chars {
            chosen.push(idx);
            used += len;
        }
    }

    if chosen.is_empty() {
        return Ok(clip_with_ellipsis(sentences[ranking[0]], opts.max_chars));
    }

    let mut pieces: Vec<(usize, String)> = chosen.iter().map(|&i| (i, sentences[i].to_string())).collect();
    // Below the soft minimum: fill the remaining room with the best sentence
    // that did not fit whole.
    if used < opts.min_chars {
        let room = opts.max_chars.saturating_sub(used + 1);
        let next = ranking.iter().copied().find(|i| !chosen.contains(i));
        if let (Some(idx), true) = (next, room > 1) {
            debug!(used, room, "Summary below minimum; clipping one more sentence in");
            pieces.push((idx, clip_with_ellipsis(sentences[idx], room)));
        }
    }
    pieces.sort_unstable_by_key(|(idx, _)| *idx);

    let mut summary = String::new();
    for (n, (_, piece)) in pieces.iter().enumerate() {
        if n > 0 {
            summary.push_str(joiner(&pieces[n - 1].1));
        }
        summary.push_str(piece);
    }
    debug!(
        sentences = sentences.len(),
        chosen = pieces.len(),
        chars = summary.chars().count(),
        min_chars = opts.min_chars,
        "Built extractive summary"
    );
    Ok(summary)
}

/// Prompt asking the generative service for a summary within the bounds.
pub fn build_summary_prompt(text: &str, opts: &SummarizeOptions) -> String {
    let input = truncate_chars(text, opts.max_input_chars);
    format!(
        "Summarise the following article in its original language, in between {} and {} characters. \
         Reply with the summary only, without a heading.\n\n{}",
        opts.min_chars, opts.max_chars, input
    )
}

/// Summarise through the generative service; the answer is clipped to
/// `opts.max_chars`.
pub async fn summarize_remote<A: AskAsync>(ask: &A, text: &str, opts: &SummarizeOptions) -> Result<String> {
    if text.trim().is_empty() {
        return Err(Error::Generation("nothing to summarise".to_string()));
    }
    let reply = ask.ask(&build_summary_prompt(text, opts)).await?;
    let reply = reply.trim();
    if reply.is_empty() {
        return Err(Error::Generation("empty summary".to_string()));
    }
    Ok(clip_with_ellipsis(reply, opts.max_chars))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(min: usize, max: usize) -> SummarizeOptions {
        SummarizeOptions {
            min_chars: min,
            max_chars: max,
            ..SummarizeOptions::default()
        }
    }

    #[test]
    fn test_split_sentences_mixed_scripts() {
        let text = "ビットコインが上昇。市場は好調！\nPrices rose 3.5 percent. Analysts agree? Yes";
        assert_eq!(
            split_sentences(text),
            vec![
                "ビットコインが上昇。",
                "市場は好調！",
                "Prices rose 3.5 percent.",
                "Analysts agree?",
                "Yes"
            ]
        );
    }

    #[test]
    fn test_short_text_is_returned_whole() {
        assert_eq!(summarize_local("  Short text.  ", &opts(1, 100)).unwrap(), "Short text.");
    }

    #[test]
    fn test_empty_text_is_generation_error() {
        let err = summarize_local("   ", &opts(1, 100)).unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[test]
    fn test_summary_respects_max_and_uses_source_sentences() {
        let text = "Bitcoin price rose sharply on Monday. \
                    Bitcoin traders cited strong bitcoin ETF inflows. \
                    The weather in Tokyo was mild. \
                    Bitcoin miners also reported higher revenue from bitcoin fees. \
                    A local bakery opened a new branch.";
        let o = opts(40, 120);
        let summary = summarize_local(text, &o).unwrap();
        let len = summary.chars().count();
        assert!(len <= 120, "summary too long: {len}");
        assert!(len >= 40, "summary too short: {len}");
        for sentence in split_sentences(&summary) {
            assert!(text.contains(sentence), "not from source: {sentence}");
        }
    }

    #[test]
    fn test_summary_is_deterministic() {
        let text = "リップルが急騰した。取引量も過去最高を記録した。専門家はリップルの今後に注目している。天気は晴れ。";
        let o = opts(5, 30);
        let a = summarize_local(text, &o).unwrap();
        let b = summarize_local(text, &o).unwrap();
        assert_eq!(a, b);
        assert!(a.chars().count() <= 30);
    }

    #[test]
    fn test_single_long_sentence_is_clipped() {
        let text = "a".repeat(300);
        let summary = summarize_local(&text, &opts(10, 50)).unwrap();
        assert_eq!(summary.chars().count(), 50);
        assert!(summary.ends_with('…'));
    }

    #[test]
    fn test_short_top_sentence_is_topped_up_to_minimum() {
        let text = "abab abab abab abab. \
                    Regulators in several jurisdictions published draft guidance on custody rules, \
                    asking exchanges to separate client funds from their own reserves. \
                    Meanwhile developers shipped a long awaited upgrade that trims validator fees, \
                    though critics warn the change could weaken network security.";
        let summary = summarize_local(text, &opts(40, 150)).unwrap();
        let len = summary.chars().count();
        assert!((40..=150).contains(&len), "summary length {len}");
        assert!(summary.starts_with("abab abab abab abab. Regulators in several"));
        assert!(summary.ends_with('…'));
    }

    #[test]
    fn test_summary_prompt_mentions_bounds() {
        let prompt = build_summary_prompt("body", &opts(40, 150));
        assert!(prompt.contains("40"));
        assert!(prompt.contains("150"));
        assert!(prompt.ends_with("body"));
    }

    struct Canned(&'static str);

    impl AskAsync for Canned {
        async fn ask(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_remote_summary_is_clipped() {
        let summary = summarize_remote(&Canned("  word word word word word  "), "body", &opts(1, 10))
            .await
            .unwrap();
        assert_eq!(summary.chars().count(), 10);
    }

    #[tokio::test]
    async fn test_remote_empty_reply_is_error() {
        let err = summarize_remote(&Canned("   "), "body", &opts(1, 10)).await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }
}

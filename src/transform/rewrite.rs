//! Generative rewrite: prompt construction and response parsing.
//!
//! The model is asked for a title on the first line followed by the body.
//! Nothing enforces that shape, so parsing is deliberately forgiving: known
//! boilerplate is stripped, heading markers are removed from the title, and a
//! response with no body gets a labelled placeholder instead of an empty string.

use crate::config::RewriteOptions;
use crate::error::{Error, Result};
use crate::models::{Article, GENERATED_BODY_MISSING};
use crate::utils::truncate_chars;
use once_cell::sync::Lazy;
use regex::Regex;

/// Markdown-ish decoration models like to put around a title line.
static TITLE_DECORATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:#+\s*|\*\*|(?:Title|タイトル)\s*[:：]\s*)*(.*?)(?:\*\*)?\s*$")
        .expect("title decoration pattern is valid")
});

/// A parsed rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub title: String,
    pub body: String,
}

/// Compile the boilerplate patterns of `opts`.
pub fn compile_patterns(opts: &RewriteOptions) -> Result<Vec<Regex>> {
    opts.boilerplate_patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| Error::Config(format!("invalid boilerplate pattern `{p}`: {e}")))
        })
        .collect()
}

/// Build the rewrite prompt for `article`. The body is cut to
/// `opts.max_input_chars` characters.
pub fn build_prompt(article: &Article, opts: &RewriteOptions) -> String {
    let body = article.body_or_placeholder();
    let clipped = truncate_chars(body, opts.max_input_chars);

    let source = if opts.include_source_url {
        format!("\n[Original URL]\n{}\n", article.source_url)
    } else {
        String::new()
    };
    let truncated = if clipped.len() < body.len() { "(article truncated)\n" } else { "" };

    let mut requirements = vec![
        format!("- Write for {}.", opts.audience),
        format!("- Keep the tone {}.", opts.tone),
        "- Put the new title alone on the first line, then the body.".to_string(),
        "- Do not include advertisements, promotional text or links.".to_string(),
    ];
    requirements.extend(opts.instructions.iter().map(|line| format!("- {line}")));

    let mut prompt = format!(
        "Rewrite the news article below as a new blog post in {}.\n\n\
         [Original title]\n{}\n\n\
         [Published]\n{}\n\
         {source}\n\
         [Article]\n{clipped}\n{truncated}\n\
         [Requirements]\n",
        opts.language,
        article.title_or_placeholder(),
        article.date_or_placeholder(),
    );
    prompt.push_str(&requirements.join("\n"));
    prompt.push('\n');
    prompt
}

/// Remove every match of `patterns` and trim.
pub fn clean_generated_text(text: &str, patterns: &[Regex]) -> String {
    let mut cleaned = text.to_string();
    for re in patterns {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    cleaned.trim().to_string()
}

fn clean_title(line: &str) -> String {
    TITLE_DECORATION
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| line.trim().to_string())
}

/// Split a model response into title (first line) and body (the rest).
///
/// # Errors
///
/// [`Error::Generation`] when nothing usable is left after cleaning.
pub fn parse_rewrite(text: &str, patterns: &[Regex]) -> Result<Rewrite> {
    let cleaned = clean_generated_text(text, patterns);
    let (first, rest) = match cleaned.split_once('\n') {
        Some((first, rest)) => (first, rest.trim()),
        None => (cleaned.as_str(), ""),
    };

    let title = clean_title(first);
    if title.is_empty() {
        return Err(Error::Generation("response has no title line".to_string()));
    }
    let body = if rest.is_empty() {
        GENERATED_BODY_MISSING.to_string()
    } else {
        rest.to_string()
    };
    Ok(Rewrite { title, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_patterns() -> Vec<Regex> {
        compile_patterns(&RewriteOptions::default()).unwrap()
    }

    #[test]
    fn test_first_line_is_title_rest_is_body() {
        let r = parse_rewrite("Title Line\nPara 1\nPara 2", &[]).unwrap();
        assert_eq!(r.title, "Title Line");
        assert_eq!(r.body, "Para 1\nPara 2");
    }

    #[test]
    fn test_single_line_gets_placeholder_body() {
        let r = parse_rewrite("Only a title", &[]).unwrap();
        assert_eq!(r.title, "Only a title");
        assert_eq!(r.body, GENERATED_BODY_MISSING);
        assert!(!r.body.is_empty());
    }

    #[test]
    fn test_title_with_blank_remainder_gets_placeholder_body() {
        let r = parse_rewrite("Title\n   \n", &[]).unwrap();
        assert_eq!(r.body, GENERATED_BODY_MISSING);
    }

    #[test]
    fn test_empty_response_is_generation_error() {
        let err = parse_rewrite("  \n ", &[]).unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[test]
    fn test_heading_markers_are_stripped_from_title() {
        let r = parse_rewrite("## **XRP hits a new high**\nBody", &[]).unwrap();
        assert_eq!(r.title, "XRP hits a new high");
        let r = parse_rewrite("タイトル：リップル急騰\n本文", &[]).unwrap();
        assert_eq!(r.title, "リップル急騰");
    }

    #[test]
    fn test_boilerplate_is_removed() {
        let text = "新タイトル\n本文です。\nBOBGについてはこちら\n参加は https://bobg.example/join";
        let r = parse_rewrite(text, &default_patterns()).unwrap();
        assert_eq!(r.title, "新タイトル");
        assert_eq!(r.body, "本文です。");
    }

    #[test]
    fn test_prompt_embeds_title_body_and_rules() {
        let mut article = Article::new("https://coinpost.jp/?p=1");
        article.title = Some("BTC rallies".to_string());
        article.body = Some("Bitcoin rose today.".to_string());
        article.date = Some("2025/05/06 08:00".to_string());
        let opts = RewriteOptions {
            include_source_url: true,
            instructions: vec!["Keep it short.".to_string()],
            ..RewriteOptions::default()
        };
        let prompt = build_prompt(&article, &opts);
        assert!(prompt.contains("BTC rallies"));
        assert!(prompt.contains("Bitcoin rose today."));
        assert!(prompt.contains("2025/05/06 08:00"));
        assert!(prompt.contains("https://coinpost.jp/?p=1"));
        assert!(prompt.contains("Keep it short."));
        assert!(prompt.contains("Do not include advertisements"));
        assert!(!prompt.contains("(article truncated)"));
    }

    #[test]
    fn test_prompt_truncates_long_body() {
        let mut article = Article::new("https://example.com");
        article.body = Some("あ".repeat(100));
        let opts = RewriteOptions {
            max_input_chars: 10,
            ..RewriteOptions::default()
        };
        let prompt = build_prompt(&article, &opts);
        assert!(prompt.contains(&"あ".repeat(10)));
        assert!(!prompt.contains(&"あ".repeat(11)));
        assert!(prompt.contains("(article truncated)"));
    }

    #[test]
    fn test_prompt_section_layout() {
        let mut article = Article::new("https://example.com/n/1");
        article.title = Some("T".to_string());
        article.body = Some("B".to_string());
        let opts = RewriteOptions {
            instructions: vec!["Last rule.".to_string()],
            ..RewriteOptions::default()
        };
        let prompt = build_prompt(&article, &opts);
        assert!(prompt.contains("\n\n[Original title]\nT\n\n[Published]\n"));
        assert!(prompt.contains("\n\n[Article]\nB\n\n[Requirements]\n- Write for "));
        assert!(!prompt.contains("[Original URL]"));
        assert!(prompt.ends_with("\n- Last rule.\n"));
    }
}

//! String and file system helpers.
//!
//! - Character-safe truncation for logs, prompts and social posts
//! - File system validation for the JSON report directory

use std::fs as stdfs;
use std::io;
use tokio::fs;
use tracing::{info, instrument};

/// Largest byte index `<= max_bytes` that lies on a char boundary of `s`.
fn floor_char_boundary(s: &str, max_bytes: usize) -> usize {
    if max_bytes >= s.len() {
        return s.len();
    }
    let mut idx = max_bytes;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (backing off to a char
/// boundary) with an ellipsis and the dropped byte count appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let cut = floor_char_boundary(s, max);
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

/// The first `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Clip `s` to `max_chars` characters, ending with `…` when anything was cut.
pub fn clip_with_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out = truncate_chars(s, max_chars - 1).trim_end().to_string();
    out.push('…');
    out
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a scratch file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> io::Result<()> {
    fs::create_dir_all(path).await?;
    // Throwaway write.
    let scratch_path = format!("{}/..__write_check__", path.trim_end_matches('/'));
    stdfs::File::create(&scratch_path)?;
    let _ = stdfs::remove_file(&scratch_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        // Each kana is three bytes; a cut at byte 4 must back off to 3.
        let result = truncate_for_log("あいうえお", 4);
        assert_eq!(result, "あ…(+12 bytes)");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("ビットコイン", 3), "ビット");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_clip_with_ellipsis() {
        assert_eq!(clip_with_ellipsis("short", 10), "short");
        assert_eq!(clip_with_ellipsis("hello world", 6), "hello…");
        assert_eq!(clip_with_ellipsis("abc", 0), "");
        assert_eq!(clip_with_ellipsis("あいうえお", 3).chars().count(), 3);
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_directory() {
        let dir = std::env::temp_dir().join(format!("coin_news_relay_test_{}", std::process::id()));
        let path = dir.to_string_lossy().to_string();
        ensure_writable_dir(&path).await.unwrap();
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}

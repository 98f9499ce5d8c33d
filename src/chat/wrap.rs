//! Streaming word wrap for terminal output.
//!
//! Text arrives in arbitrary fragments, so wrapping cannot wait for whole
//! words. Characters are echoed as they come; when a line fills, the
//! in-progress word is erased from the end of the line with ANSI escapes and
//! reprinted at the start of the next one.

use std::io::Write;

use crate::Result;

/// Wraps streamed text at word boundaries as it is written.
///
/// Wrapping happens five columns short of the configured width so the
/// reprinted word plus cursor never touch the terminal's own wrap column.
pub struct WordWrapper {
    width: usize,
    line_len: usize,
    word: String,
}

impl WordWrapper {
    /// Create a wrapper for a terminal of the given width in columns.
    pub fn new(width: usize) -> Self {
        WordWrapper {
            width,
            line_len: 0,
            word: String::new(),
        }
    }

    /// Write a fragment of text, wrapping lines as they fill.
    ///
    /// Every character of `text` lands on `out` exactly once; wrapping only
    /// inserts escape sequences and newlines around them. Fragments may cut
    /// words anywhere and produce identical output to a single write.
    pub fn write<W: Write>(&mut self, out: &mut W, text: &str) -> Result<()> {
        let limit = self.width.saturating_sub(5);
        for ch in text.chars() {
            if self.line_len + 1 > limit {
                // Erase the split word from this line and restart it below.
                let back = self.word.chars().count();
                write!(out, "\x1b[{back}D\x1b[K\n{}{ch}", self.word)?;
                self.line_len = back + 1;
            } else {
                write!(out, "{ch}")?;
                self.line_len += 1;
            }
            match ch {
                ' ' => self.word.clear(),
                '\n' => self.line_len = 0,
                _ => self.word.push(ch),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Interpret the wrapper's output the way a terminal would: `ESC[nD`
    /// moves the cursor left, `ESC[K` clears to end of line, and characters
    /// overwrite at the cursor column.
    fn visible(bytes: &[u8]) -> Vec<String> {
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let mut lines: Vec<Vec<char>> = vec![Vec::new()];
        let mut col = 0usize;
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '\x1b' {
                assert_eq!(chars.next(), Some('['));
                let mut arg = String::new();
                let mut cmd = ' ';
                for c in chars.by_ref() {
                    if c.is_ascii_digit() {
                        arg.push(c);
                    } else {
                        cmd = c;
                        break;
                    }
                }
                match cmd {
                    'D' => col -= arg.parse::<usize>().unwrap(),
                    'K' => lines.last_mut().unwrap().truncate(col),
                    _ => panic!("unexpected escape {cmd}"),
                }
            } else if ch == '\n' {
                lines.push(Vec::new());
                col = 0;
            } else {
                let line = lines.last_mut().unwrap();
                if col < line.len() {
                    line[col] = ch;
                } else {
                    line.push(ch);
                }
                col += 1;
            }
        }
        lines.into_iter().map(|l| l.into_iter().collect()).collect()
    }

    #[test]
    fn short_text_passes_through() {
        let mut wrapper = WordWrapper::new(80);
        let mut out = Vec::new();
        wrapper.write(&mut out, "hello world").unwrap();
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn wraps_at_word_boundary() {
        let mut wrapper = WordWrapper::new(20);
        let mut out = Vec::new();
        wrapper.write(&mut out, "the quick brown fox jumps").unwrap();
        let lines = visible(&out);
        for line in &lines {
            assert!(line.trim_end().chars().count() <= 15, "too wide: {line:?}");
        }
        let joined = lines.join("");
        assert_eq!(
            joined.split_whitespace().collect::<Vec<_>>(),
            vec!["the", "quick", "brown", "fox", "jumps"]
        );
    }

    #[test]
    fn long_word_survives_wrap_intact() {
        let mut wrapper = WordWrapper::new(20);
        let mut out = Vec::new();
        wrapper
            .write(&mut out, "a very long wordthatwontfit here")
            .unwrap();
        let lines = visible(&out);
        for line in &lines {
            assert!(line.trim_end().chars().count() <= 15, "too wide: {line:?}");
        }
        assert!(
            lines
                .iter()
                .any(|l| l.trim_end().contains("wordthatwontfit")),
            "word was mangled: {lines:?}"
        );
        let joined = lines.join("");
        assert_eq!(
            joined.split_whitespace().collect::<Vec<_>>(),
            vec!["a", "very", "long", "wordthatwontfit", "here"]
        );
    }

    #[test]
    fn chunked_writes_match_single_write() {
        let text = "streaming fragments can split words anywhere in the text";
        let mut whole = Vec::new();
        let mut wrapper = WordWrapper::new(24);
        wrapper.write(&mut whole, text).unwrap();

        let mut pieces = Vec::new();
        let mut wrapper = WordWrapper::new(24);
        for chunk in text.as_bytes().chunks(3) {
            wrapper
                .write(&mut pieces, std::str::from_utf8(chunk).unwrap())
                .unwrap();
        }
        assert_eq!(whole, pieces);
    }

    #[test]
    fn newline_resets_line_length() {
        let mut wrapper = WordWrapper::new(20);
        let mut out = Vec::new();
        wrapper.write(&mut out, "first line\nsecond").unwrap();
        let lines = visible(&out);
        assert_eq!(lines, vec!["first line", "second"]);
    }
}

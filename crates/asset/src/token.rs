//! Cursor over a single line of mesh text.
//!
//! Words are separated by runs of tab, space, `(`, `)` and `"`. Numeric reads never
//! fail: a word that is not a number comes back as NaN (floats) or `None` (ints) and
//! the caller decides what that means.

const fn is_delimiter(b: u8) -> bool {
    matches!(b, b'\t' | b' ' | b'(' | b')' | b'"')
}

#[derive(Clone, Debug, Default)]
pub struct TokenReader<'a> {
    line: &'a str,
    cursor: usize,
}

impl<'a> TokenReader<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            line: line.trim(),
            cursor: 0,
        }
    }

    /// Point the reader at a new line and rewind the cursor.
    pub fn reset(&mut self, line: &'a str) {
        self.line = line.trim();
        self.cursor = 0;
    }

    fn skip_delimiters(&mut self) {
        let bytes = self.line.as_bytes();
        while self.cursor < bytes.len() && is_delimiter(bytes[self.cursor]) {
            self.cursor += 1;
        }
    }

    fn word_len(&self) -> usize {
        self.line.as_bytes()[self.cursor..]
            .iter()
            .take_while(|&&b| !is_delimiter(b))
            .count()
    }

    /// Next word on the line, or `None` once the line is exhausted.
    pub fn next_word(&mut self) -> Option<&'a str> {
        self.skip_delimiters();
        let n = self.word_len();
        if n == 0 {
            return None;
        }
        // Delimiters are ASCII, so both ends sit on char boundaries.
        let word = &self.line[self.cursor..self.cursor + n];
        // Step over the word and the delimiter that ended it.
        self.cursor = (self.cursor + n + 1).min(self.line.len());
        Some(word)
    }

    /// Next word as an integer; `None` if missing or not numeric.
    pub fn next_int(&mut self) -> Option<i64> {
        self.next_word().and_then(parse_int)
    }

    /// Next word as a float; NaN if missing or not numeric.
    pub fn next_float(&mut self) -> f32 {
        self.next_word().map_or(f32::NAN, parse_float)
    }

    /// Remaining words on the line.
    pub fn words(&mut self) -> Words<'_, 'a> {
        Words { reader: self }
    }
}

pub struct Words<'r, 'a> {
    reader: &'r mut TokenReader<'a>,
}

impl<'a> Iterator for Words<'_, 'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.reader.next_word()
    }
}

pub fn parse_float(word: &str) -> f32 {
    word.parse::<f32>().unwrap_or(f32::NAN)
}

pub fn parse_int(word: &str) -> Option<i64> {
    word.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_every_delimiter_kind() {
        let mut r = TokenReader::new("  v\t1.0  (2.5) \"abc\"  ");
        assert_eq!(r.next_word(), Some("v"));
        assert_eq!(r.next_word(), Some("1.0"));
        assert_eq!(r.next_word(), Some("2.5"));
        assert_eq!(r.next_word(), Some("abc"));
        assert_eq!(r.next_word(), None);
        assert_eq!(r.next_word(), None);
    }

    #[test]
    fn empty_and_blank_lines_have_no_words() {
        assert_eq!(TokenReader::new("").next_word(), None);
        assert_eq!(TokenReader::new(" \t ").next_word(), None);
    }

    #[test]
    fn numeric_reads_do_not_validate() {
        let mut r = TokenReader::new("vn abc 7 x");
        assert_eq!(r.next_word(), Some("vn"));
        assert!(r.next_float().is_nan());
        assert_eq!(r.next_int(), Some(7));
        assert_eq!(r.next_int(), None);
        // Past the end of the line.
        assert!(r.next_float().is_nan());
    }

    #[test]
    fn words_iterates_remaining_tokens() {
        let mut r = TokenReader::new("f 1/1/1 2/2/1 3/3/1");
        r.next_word();
        let rest: Vec<_> = r.words().collect();
        assert_eq!(rest, vec!["1/1/1", "2/2/1", "3/3/1"]);
    }

    #[test]
    fn reset_rewinds_on_a_new_line() {
        let mut r = TokenReader::new("a b");
        r.next_word();
        r.reset("c");
        assert_eq!(r.next_word(), Some("c"));
    }
}

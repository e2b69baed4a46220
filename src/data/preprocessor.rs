// ============================================================
// Layer 4 — Sentence Preprocessor
// ============================================================
// Normalises one raw corpus sentence and splits it into word
// tokens for the vocabulary.
//
// Cleaning steps (applied in order):
//   1. Map Unicode whitespace variants and control chars to space
//   2. Lowercase
//   3. Put spaces around sentence punctuation (. ! ? ,)
//      so "go." becomes the two tokens "go" and "."
//   4. Split on whitespace, which also collapses repeated spaces
//
// Reference: Rust Book §8 (Strings in Rust)

const PUNCTUATION: [char; 4] = ['.', '!', '?', ','];

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Normalise a sentence without tokenising it.
    pub fn clean(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 8);

        for c in text.chars() {
            match c {
                '\t' | '\r' | '\n' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => out.push(' '),
                c if c.is_control() => out.push(' '),
                c if PUNCTUATION.contains(&c) => {
                    out.push(' ');
                    out.push(c);
                    out.push(' ');
                }
                c => out.extend(c.to_lowercase()),
            }
        }

        out.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Clean then split into word tokens.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.clean(text).split(' ').filter(|w| !w.is_empty()).map(String::from).collect()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*|\p{N}+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Splits normalized text into index terms. The same instance must be used
/// at build time and at query time.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Which built-in tokenizer an index was built with. Recorded in `meta.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    #[default]
    Word,
    Stemming,
}

impl TokenizerKind {
    pub fn build(self) -> Box<dyn Tokenizer> {
        match self {
            TokenizerKind::Word => Box::new(WordTokenizer),
            TokenizerKind::Stemming => Box::new(StemmingTokenizer::default()),
        }
    }
}

impl std::str::FromStr for TokenizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "word" => Ok(TokenizerKind::Word),
            "stemming" | "stem" => Ok(TokenizerKind::Stemming),
            other => Err(format!("unknown tokenizer: {other}")),
        }
    }
}

/// Whitespace split with lowercasing. On text that already went through
/// [`crate::normalize::clean`] this matches plain word tokenization.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(|w| w.to_lowercase()).collect()
    }
}

/// NFKC normalization, lowercase, stopword removal and English stemming.
#[derive(Debug, Clone, Copy)]
pub struct StemmingTokenizer {
    pub min_len: usize,
}

impl Default for StemmingTokenizer {
    fn default() -> Self {
        Self { min_len: 2 }
    }
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

impl Tokenizer for StemmingTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        let mut tokens = Vec::new();
        for mat in WORD.find_iter(&normalized) {
            let token = mat.as_str();
            if is_stopword(token) { continue; }
            let stem = STEMMER.stem(token);
            if stem.chars().count() < self.min_len { continue; }
            tokens.push(stem.into_owned());
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_tokenizer_lowercases() {
        let t = WordTokenizer.tokenize("Great PETS  are great");
        assert_eq!(t, vec!["great", "pets", "are", "great"]);
    }

    #[test]
    fn stemming_tokenizer_stems_and_drops_stopwords() {
        let t = StemmingTokenizer::default().tokenize("The Running runners are RUN");
        assert!(t.iter().any(|w| w == "run"));
        assert!(!t.iter().any(|w| w == "the" || w == "are"));
    }

    #[test]
    fn stemming_tokenizer_keeps_numbers() {
        let t = StemmingTokenizer::default().tokenize("cs 4710 spring 2019");
        assert!(t.contains(&"4710".to_string()));
        assert!(t.contains(&"2019".to_string()));
    }

    #[test]
    fn kind_parses() {
        assert_eq!("stem".parse::<TokenizerKind>().unwrap(), TokenizerKind::Stemming);
        assert_eq!("Word".parse::<TokenizerKind>().unwrap(), TokenizerKind::Word);
        assert!("bpe".parse::<TokenizerKind>().is_err());
    }
}

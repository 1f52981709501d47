use blendsearch_core::normalize::normalize;
use blendsearch_core::tokenizer::{StemmingTokenizer, Tokenizer, WordTokenizer};

#[test]
fn it_normalizes_and_stems() {
    let words = StemmingTokenizer::default().tokenize("Running Runners RUN! The café's menu.");
    assert!(words.contains(&"run".to_string()));
    assert!(words.contains(&"menu".to_string()));
}

#[test]
fn it_filters_stopwords() {
    let words = StemmingTokenizer::default().tokenize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
}

#[test]
fn query_path_matches_index_path() {
    // the same normalized text must yield the same terms on both paths
    let text = normalize("Cornelia Caragea -- Machine Learning!");
    let words = WordTokenizer.tokenize(&text);
    assert_eq!(words, vec!["cornelia", "caragea", "machine", "learning"]);
}

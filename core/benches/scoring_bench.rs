use blendsearch_core::normalize::normalize;
use blendsearch_core::tokenizer::{StemmingTokenizer, Tokenizer, WordTokenizer};
use blendsearch_core::{Corpus, Document, LexicalIndex};
use criterion::{criterion_group, criterion_main, Criterion};

const TEXT: &str = "The crawler collects pages from the department web site, keeps the anchor \
text of every link as the primary description and the page body as secondary text. \
Queries are scored lexically and semantically before authority reranking.";

fn synthetic_corpus(n: usize) -> Corpus {
    let words: Vec<&str> = TEXT.split_whitespace().collect();
    let docs = (0..n)
        .map(|i| {
            let primary: Vec<&str> = words.iter().cycle().skip(i % words.len()).take(12).copied().collect();
            let secondary: Vec<&str> = words.iter().cycle().skip(i * 7 % words.len()).take(40).copied().collect();
            Document::new(&format!("http://site/{i}"), &format!("Page {i}"), &primary.join(" "), &secondary.join(" "))
        })
        .collect();
    Corpus::new(docs)
}

fn bench_tokenize(c: &mut Criterion) {
    let text = normalize(TEXT);
    c.bench_function("tokenize_word", |b| b.iter(|| WordTokenizer.tokenize(&text)));
    let stemmer = StemmingTokenizer::default();
    c.bench_function("tokenize_stemming", |b| b.iter(|| stemmer.tokenize(&text)));
}

fn bench_lexical(c: &mut Criterion) {
    let corpus = synthetic_corpus(2_000);
    c.bench_function("lexical_build_2k", |b| b.iter(|| LexicalIndex::build(&corpus, &WordTokenizer)));
    let index = LexicalIndex::build(&corpus, &WordTokenizer);
    let query = WordTokenizer.tokenize(&normalize("anchor text of the page body"));
    c.bench_function("lexical_score_2k", |b| b.iter(|| index.score(&query)));
}

criterion_group!(benches, bench_tokenize, bench_lexical);
criterion_main!(benches);

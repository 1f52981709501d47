//! Crawl snapshot loading.
//!
//! A snapshot is one or more JSON/JSONL files. Each record carries a URL,
//! a title, the primary text (anchor/summary text that is embedded), the
//! secondary text (page body, lexical only) and optional outlinks.

use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
    pub primary_text: String,
    pub secondary_text: String,
    #[serde(default)]
    pub outlinks: Vec<String>,
}

impl Document {
    pub fn new(url: &str, title: &str, primary_text: &str, secondary_text: &str) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            primary_text: primary_text.to_string(),
            secondary_text: secondary_text.to_string(),
            outlinks: Vec::new(),
        }
    }

    pub fn with_outlinks<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outlinks = links.into_iter().map(Into::into).collect();
        self
    }

    /// Text fed to the lexical index: primary followed by secondary.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.primary_text, self.secondary_text)
    }
}

#[derive(Debug, Deserialize)]
struct InputDoc {
    #[serde(default, alias = "origin_link")]
    url: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default, alias = "atext")]
    primary_text: String,
    #[serde(default, alias = "body", alias = "contents")]
    secondary_text: String,
    #[serde(default)]
    outlinks: Vec<String>,
}

impl InputDoc {
    fn into_document(self, fallback_url: Option<&str>) -> Result<Document> {
        let url = self
            .url
            .or_else(|| fallback_url.map(str::to_string))
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| IndexError::Corpus("record without url".into()))?;
        Ok(Document {
            url,
            title: self.title,
            primary_text: self.primary_text,
            secondary_text: self.secondary_text,
            outlinks: self.outlinks,
        })
    }
}

/// Ordered, URL-unique document collection. Position is the corpus order
/// that the embedding matrix rows follow.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    docs: Vec<Document>,
    positions: HashMap<String, usize>,
}

impl Corpus {
    /// Builds a corpus keeping the first occurrence of every URL.
    pub fn new(docs: Vec<Document>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(docs.len());
        for doc in docs {
            if seen.insert(doc.url.clone()) {
                kept.push(doc);
            } else {
                tracing::warn!(url = %doc.url, "duplicate url in corpus, keeping first");
            }
        }
        let positions = kept.iter().enumerate().map(|(i, d)| (d.url.clone(), i)).collect();
        Self { docs: kept, positions }
    }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    pub fn docs(&self) -> &[Document] { &self.docs }

    pub fn get(&self, url: &str) -> Option<&Document> {
        self.positions.get(url).map(|&i| &self.docs[i])
    }

    pub fn position(&self, url: &str) -> Option<usize> {
        self.positions.get(url).copied()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.docs.iter().map(|d| d.url.as_str())
    }

    pub fn title(&self, url: &str) -> Option<&str> {
        self.get(url).map(|d| d.title.as_str())
    }
}

/// Load a snapshot from a `.json`/`.jsonl` file or a directory of them.
///
/// JSON files may hold an array of records, a single record, or an object
/// mapping url to record. Directory entries are visited in sorted order so the
/// resulting corpus order is reproducible.
pub fn load_corpus<P: AsRef<Path>>(input: P) -> Result<Corpus> {
    let input = input.as_ref();
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        return Err(IndexError::Missing(input.to_path_buf()));
    }

    let mut docs = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut docs)?;
        } else {
            read_json(&file, &mut docs)?;
        }
    }

    let corpus = Corpus::new(docs);
    if corpus.is_empty() {
        return Err(IndexError::Corpus(format!("no documents found in {}", input.display())));
    }
    tracing::info!(num_docs = corpus.len(), "corpus loaded");
    Ok(corpus)
}

fn parse_err(file: &Path, e: serde_json::Error) -> IndexError {
    IndexError::Corpus(format!("{}: {e}", file.display()))
}

fn read_jsonl(file: &Path, docs: &mut Vec<Document>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: InputDoc = serde_json::from_str(&line).map_err(|e| parse_err(file, e))?;
        docs.push(doc.into_document(None)?);
    }
    Ok(())
}

fn read_json(file: &Path, docs: &mut Vec<Document>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader).map_err(|e| parse_err(file, e))?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let doc: InputDoc = serde_json::from_value(v).map_err(|e| parse_err(file, e))?;
                docs.push(doc.into_document(None)?);
            }
        }
        serde_json::Value::Object(map) if is_record(&map) => {
            let doc: InputDoc = serde_json::from_value(serde_json::Value::Object(map))
                .map_err(|e| parse_err(file, e))?;
            docs.push(doc.into_document(None)?);
        }
        serde_json::Value::Object(map) => {
            for (url, v) in map {
                let doc: InputDoc = serde_json::from_value(v).map_err(|e| parse_err(file, e))?;
                docs.push(doc.into_document(Some(&url))?);
            }
        }
        other => {
            return Err(IndexError::Corpus(format!(
                "{}: expected an array or object of records, found {}",
                file.display(),
                json_kind(&other)
            )));
        }
    }
    Ok(())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn is_record(map: &serde_json::Map<String, serde_json::Value>) -> bool {
    ["url", "origin_link", "title", "primary_text", "atext"]
        .iter()
        .any(|k| map.get(*k).map_or(false, |v| v.is_string()))
}

use crate::config::BuildOptions;
use crate::corpus::{Corpus, Document};
use crate::embedding::EmbeddingStore;
use crate::error::{IndexError, Result};
use crate::index::LexicalIndex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: usize,
    pub created_at: String,
    pub version: u32,
    pub build: BuildOptions,
}

impl MetaFile {
    pub fn new(num_docs: usize, build: BuildOptions) -> Self {
        let created_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        Self { num_docs, created_at, version: FORMAT_VERSION, build }
    }
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    pub fn lexical(&self) -> PathBuf { self.root.join("lexical.bin") }
    pub fn embeddings(&self) -> PathBuf { self.root.join("embeddings.bin") }
}

/// One named matrix inside the embedding container.
#[derive(Debug, Serialize, Deserialize)]
struct Tensor {
    urls: Vec<String>,
    shape: [usize; 2],
    data: Vec<f32>,
    checksum: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TensorFile {
    datasets: BTreeMap<String, Tensor>,
}

fn tensor_checksum(urls: &[String], data: &[f32]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for url in urls {
        hasher.update(url.as_bytes());
        hasher.update(&[0]);
    }
    for x in data {
        hasher.update(&x.to_le_bytes());
    }
    hasher.finalize()
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut f = File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_existing(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(IndexError::Missing(path.to_path_buf()));
    }
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(buf)
}

fn encode<T: Serialize>(path: &Path, value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| IndexError::Corrupt { path: path.to_path_buf(), reason: e.to_string() })
}

fn decode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let buf = read_existing(path)?;
    bincode::deserialize(&buf).map_err(|e| IndexError::Corrupt { path: path.to_path_buf(), reason: e.to_string() })
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    let json = serde_json::to_string_pretty(meta)
        .map_err(|e| IndexError::Corrupt { path: paths.meta(), reason: e.to_string() })?;
    write_atomic(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let path = paths.meta();
    let buf = read_existing(&path)?;
    let meta: MetaFile = serde_json::from_slice(&buf)
        .map_err(|e| IndexError::Corrupt { path: path.clone(), reason: e.to_string() })?;
    if meta.version != FORMAT_VERSION {
        return Err(IndexError::Corrupt {
            path,
            reason: format!("unsupported format version {}", meta.version),
        });
    }
    Ok(meta)
}

pub fn save_docs(paths: &IndexPaths, corpus: &Corpus) -> Result<()> {
    let path = paths.docs();
    let bytes = encode(&path, &corpus.docs())?;
    write_atomic(&path, &bytes)
}

pub fn load_docs(paths: &IndexPaths) -> Result<Corpus> {
    let docs: Vec<Document> = decode(&paths.docs())?;
    Ok(Corpus::new(docs))
}

/// Postings, IDF and norms go to disk as a single file.
pub fn save_lexical(paths: &IndexPaths, index: &LexicalIndex) -> Result<()> {
    let path = paths.lexical();
    let bytes = encode(&path, index)?;
    write_atomic(&path, &bytes)
}

pub fn load_lexical(paths: &IndexPaths) -> Result<LexicalIndex> {
    decode(&paths.lexical())
}

pub fn save_embeddings(paths: &IndexPaths, dataset: &str, store: &EmbeddingStore) -> Result<()> {
    let path = paths.embeddings();
    let tensor = Tensor {
        urls: store.urls().to_vec(),
        shape: [store.len(), store.dim()],
        data: store.data().to_vec(),
        checksum: tensor_checksum(store.urls(), store.data()),
    };
    let mut file = TensorFile::default();
    file.datasets.insert(dataset.to_string(), tensor);
    let bytes = encode(&path, &file)?;
    write_atomic(&path, &bytes)
}

pub fn load_embeddings(paths: &IndexPaths, dataset: &str) -> Result<EmbeddingStore> {
    let path = paths.embeddings();
    let mut file: TensorFile = decode(&path)?;
    let tensor = file.datasets.remove(dataset).ok_or_else(|| IndexError::Corrupt {
        path: path.clone(),
        reason: format!("dataset {dataset:?} not found"),
    })?;
    if tensor_checksum(&tensor.urls, &tensor.data) != tensor.checksum {
        return Err(IndexError::Corrupt { path, reason: "checksum mismatch".into() });
    }
    let [rows, dim] = tensor.shape;
    if rows != tensor.urls.len() {
        return Err(IndexError::Mismatch(format!("{rows} embedding rows for {} urls", tensor.urls.len())));
    }
    EmbeddingStore::from_parts(tensor.urls, dim, tensor.data)
}

/// Everything produced by a fresh build.
#[derive(Debug, Clone)]
pub struct IndexBundle {
    pub meta: MetaFile,
    pub corpus: Corpus,
    pub lexical: LexicalIndex,
    pub embeddings: EmbeddingStore,
}

pub fn save_bundle(paths: &IndexPaths, bundle: &IndexBundle) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_docs(paths, &bundle.corpus)?;
    save_lexical(paths, &bundle.lexical)?;
    save_embeddings(paths, &bundle.meta.build.dataset, &bundle.embeddings)?;
    // meta last: a directory without it is not a finished index
    save_meta(paths, &bundle.meta)?;
    Ok(())
}

/// Load and cross-check every bundle. Any inconsistency is fatal.
pub fn load_bundle(paths: &IndexPaths) -> Result<IndexBundle> {
    let meta = load_meta(paths)?;
    let corpus = load_docs(paths)?;
    let lexical = load_lexical(paths)?;
    let embeddings = load_embeddings(paths, &meta.build.dataset)?;

    if meta.num_docs != corpus.len() {
        return Err(IndexError::Mismatch(format!(
            "meta records {} documents, docs bundle has {}",
            meta.num_docs,
            corpus.len()
        )));
    }
    lexical.validate(&corpus)?;
    embeddings.validate(&corpus)?;
    if embeddings.dim() != meta.build.embedding_dim {
        return Err(IndexError::Dimension { expected: meta.build.embedding_dim, actual: embeddings.dim() });
    }
    tracing::info!(
        root = %paths.root.display(),
        num_docs = corpus.len(),
        num_terms = lexical.num_terms(),
        dim = embeddings.dim(),
        "index bundle loaded"
    );
    Ok(IndexBundle { meta, corpus, lexical, embeddings })
}

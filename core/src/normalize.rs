use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_ALNUM: Regex = Regex::new(r"[^a-zA-Z0-9 ]").expect("valid regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
}

/// Replace everything outside `[a-zA-Z0-9 ]` with a space, collapse runs of
/// whitespace and trim. Case is preserved.
pub fn clean(text: &str) -> String {
    let stripped = NON_ALNUM.replace_all(text, " ");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// [`clean`] after lowercasing. Used on the query and embedding paths.
pub fn normalize(text: &str) -> String {
    clean(&text.to_lowercase())
}

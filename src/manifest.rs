use serde::Deserialize;

use crate::request::GvkFilter;

// ---------------------------------------------------------------------------
// Document identity
// ---------------------------------------------------------------------------

/// The two identity fields extracted from one YAML document. Nothing else in
/// a manifest is inspected; absent fields deserialize to empty strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DocMeta {
    api_version: String,
    kind: String,
}

/// Split an `apiVersion` value at its first `/`.
///
/// `"apps/v1"` → `("apps", "v1")`; a bare `"v1"` belongs to the core group
/// and yields `("", "v1")`.
fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

/// Cheap pre-filter: does the raw content contain `kind:` at all,
/// case-insensitively? Content that cannot possibly match is rejected
/// without paying for a YAML parse.
fn contains_kind_marker(data: &[u8]) -> bool {
    data.windows(5).any(|w| w.eq_ignore_ascii_case(b"kind:"))
}

/// Split raw content at `---` boundary lines into individual documents.
///
/// Documents are parsed in isolation so one garbled document cannot poison
/// the rest of the stream — a YAML scanner error is unrecoverable within a
/// single parse, but the next chunk starts a fresh one.
///
/// Only a bare `---` line (trailing whitespace allowed) is a boundary. A
/// directives-end marker carrying content on the same line (`--- !tag`,
/// `--- {}`) is left inside the surrounding chunk; if that chunk then fails
/// to parse it is skipped wholesale, like any other malformed document.
fn split_documents(data: &[u8]) -> Vec<&[u8]> {
    let mut documents = Vec::new();
    let mut doc_start = 0;
    let mut line_start = 0;

    for (i, byte) in data.iter().enumerate() {
        if *byte == b'\n' {
            if is_boundary_line(&data[line_start..i]) {
                documents.push(&data[doc_start..line_start]);
                doc_start = i + 1;
            }
            line_start = i + 1;
        }
    }
    if line_start < data.len() && is_boundary_line(&data[line_start..]) {
        documents.push(&data[doc_start..line_start]);
    } else {
        documents.push(&data[doc_start..]);
    }
    documents
}

fn is_boundary_line(line: &[u8]) -> bool {
    line.trim_ascii_end() == b"---"
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Report whether any document in `data` satisfies `filter`.
///
/// The content is treated as a multi-document YAML stream. A document that
/// fails to deserialize is skipped and the stream continues — garbled input
/// is tolerated, never fatal. The first matching document decides; no
/// partial or multi-document result is surfaced.
pub(crate) fn matches(data: &[u8], filter: &GvkFilter) -> bool {
    if !contains_kind_marker(data) {
        return false;
    }

    for document in split_documents(data) {
        let meta: DocMeta = match serde_yaml::from_slice(document) {
            Ok(meta) => meta,
            Err(_) => continue, // malformed document, keep going
        };

        if !meta.kind.eq_ignore_ascii_case(&filter.kind) {
            continue;
        }

        let (group, version) = split_api_version(&meta.api_version);
        if filter.group_accepts(group) && filter.version_accepts(version) {
            return true;
        }
    }

    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

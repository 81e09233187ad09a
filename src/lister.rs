// src/lister.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Hierarchical listing on top of a flat, marker-paginated key listing.

use tracing::debug;

use crate::constants::{LIST_PAGE_SIZE, PATH_DELIMITER};
use crate::error::{Error, Result};
use crate::transport::{KeyPage, ObjectTransport};
use crate::uri::{FileInfo, Uri};

/// List every entry directly under `path`'s key prefix, across all pages.
///
/// Object keys become [`FileType::File`](crate::FileType::File) entries and
/// common prefixes become directories (size 0). Entries carry the protocol
/// and bucket of `path`. Within a page files come before directories; pages
/// are concatenated in marker order. Any failed page fails the whole call.
pub fn list_objects(transport: &dyn ObjectTransport, path: &Uri) -> Result<Vec<FileInfo>> {
    let prefix = path.transport_key();
    let mut entries = Vec::new();
    let mut marker = String::new();
    let mut pages = 0usize;

    loop {
        let page = transport.list_keys(&path.host, prefix, &marker, PATH_DELIMITER, LIST_PAGE_SIZE)?;
        pages += 1;

        let next = resume_marker(&page);
        append_page(path, &page, &mut entries);

        if !page.is_truncated {
            break;
        }
        match next {
            Some(m) if m.as_str() > marker.as_str() => marker = m,
            _ => {
                return Err(Error::integrity(
                    path.to_string(),
                    format!("listing truncated after page {pages} without a usable marker"),
                ));
            }
        }
    }

    debug!(path = %path, entries = entries.len(), pages, "listed objects");
    Ok(entries)
}

/// The marker to resume from: the store's own, or else the last entry of the
/// page. A page lists keys and prefixes in key order, so the greater of the
/// last key and the last prefix is the last entry.
fn resume_marker(page: &KeyPage) -> Option<String> {
    if let Some(m) = page.next_marker.as_ref().filter(|m| !m.is_empty()) {
        return Some(m.clone());
    }
    let last_key = page.objects.last().map(|o| o.key.as_str());
    let last_prefix = page.common_prefixes.last().map(String::as_str);
    last_key.max(last_prefix).map(str::to_string)
}

fn append_page(path: &Uri, page: &KeyPage, out: &mut Vec<FileInfo>) {
    for obj in &page.objects {
        out.push(FileInfo::file(path.with_name(format!("/{}", obj.key)), obj.size));
    }
    for prefix in &page.common_prefixes {
        out.push(FileInfo::directory(path.with_name(format!("/{prefix}"))));
    }
}

// src/match_file.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Input pattern resolution for batch tools.
//!
//! A pattern is a path whose last component is a regular expression, e.g.
//! `obs://models/run-7/part-\d+`. The expression must match a whole name in
//! the parent directory; subdirectories are never matched.

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::stream_factory::StreamFactory;
use crate::uri::Uri;

/// Split a pattern into its parent directory and the final component.
fn split_pattern(pattern: &Uri) -> (Uri, &str) {
    match pattern.name.rfind('/') {
        Some(idx) => (pattern.with_name(&pattern.name[..=idx]), &pattern.name[idx + 1..]),
        None => (pattern.with_name(""), pattern.name.as_str()),
    }
}

/// Files matching `pattern`, as full paths, in listing order.
pub fn match_files(factory: &StreamFactory, pattern: &str) -> Result<Vec<String>> {
    let uri = Uri::parse(pattern);
    let (dir, expr) = split_pattern(&uri);
    if expr.is_empty() {
        return Err(Error::usage(format!("pattern '{pattern}' has no file component")));
    }
    let re = Regex::new(&format!("^(?:{expr})$"))
        .map_err(|e| Error::usage(format!("invalid file pattern '{expr}': {e}")))?;

    let matched: Vec<String> = factory
        .filesystem_for(&dir)?
        .list_directory(&dir)?
        .into_iter()
        .filter(|e| !e.is_dir() && re.is_match(e.path.basename()))
        .map(|e| e.path.to_string())
        .collect();

    debug!(pattern, dir = %dir, matched = matched.len(), "resolved file pattern");
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_last_component() {
        let uri = Uri::parse("obs://bkt/models/part-\\d+");
        let (dir, expr) = split_pattern(&uri);
        assert_eq!(dir.to_string(), "obs://bkt/models/");
        assert_eq!(expr, "part-\\d+");

        let uri = Uri::parse("part-.*");
        let (dir, expr) = split_pattern(&uri);
        assert_eq!(dir.name, "");
        assert_eq!(expr, "part-.*");
    }

    #[test]
    fn rejects_bad_expression() {
        let factory = StreamFactory::local_only();
        assert!(matches!(match_files(&factory, "/tmp/part-(["), Err(Error::Usage { .. })));
        assert!(matches!(match_files(&factory, "/tmp/"), Err(Error::Usage { .. })));
    }
}

//! Best-effort scanner for DMR bracket-notation dumps.
//!
//! Older management interfaces answer resource listings in a textual format
//! that looks like JSON but uses `=>` arrows and bare keywords:
//!
//! ```text
//! {
//!     "outcome" => "success",
//!     "result" => {
//!         "data-source" => {
//!             "ExampleDS" => {
//!                 "enabled" => true,
//!                 "jndi-name" => "java:jboss/datasources/ExampleDS"
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! There is no grammar worth committing to here; the scanner walks `{...}`
//! blocks structurally and extracts `name`/`enabled` pairs, returning
//! whatever it can recognize. Truncated or mangled dumps degrade to fewer
//! (or zero) entries, never to an error.

use std::sync::OnceLock;

use regex::Regex;

use crate::{ResourceState, ResourceStatus};

static ENTRY_RE: OnceLock<Regex> = OnceLock::new();
static ENABLED_RE: OnceLock<Regex> = OnceLock::new();

fn entry_re() -> &'static Regex {
    ENTRY_RE.get_or_init(|| Regex::new(r#""([^"]+)"\s*=>\s*\{"#).expect("entry pattern"))
}

fn enabled_re() -> &'static Regex {
    ENABLED_RE.get_or_init(|| Regex::new(r#""enabled"\s*=>\s*(true|false)"#).expect("enabled pattern"))
}

/// Extract datasource entries from a bracket-notation dump.
pub fn scan_datasources(raw: &str) -> Vec<ResourceStatus> {
    let mut out = Vec::new();

    for caps in entry_re().captures_iter(raw) {
        let name = &caps[1];
        let Some(open) = caps.get(0) else { continue };
        let Some(block) = block_at(raw, open.end() - 1) else {
            continue;
        };

        // Only blocks that directly carry an `enabled` pair are entries;
        // section blocks (`result`, `data-source`) merely nest further
        // blocks, which get stripped before the check.
        let direct = strip_nested_blocks(block);
        let Some(flag) = enabled_re().captures(&direct) else {
            continue;
        };

        out.push(ResourceStatus {
            name: name.to_string(),
            kind: section_before(raw, open.start()).to_string(),
            status: if &flag[1] == "true" {
                ResourceState::Up
            } else {
                ResourceState::Down
            },
        });
    }

    out
}

/// The `{...}` block whose opening brace sits at `open_idx`, braces included.
/// `None` when the dump is truncated before the block closes.
fn block_at(raw: &str, open_idx: usize) -> Option<&str> {
    let mut depth = 0usize;
    for (offset, ch) in raw[open_idx..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[open_idx..open_idx + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// The block's own content with every nested `{...}` removed, so a section
/// never inherits an `enabled` pair from one of its children.
fn strip_nested_blocks(block: &str) -> String {
    let inner = &block[1..block.len() - 1];
    let mut depth = 0usize;
    let mut direct = String::with_capacity(inner.len());
    for ch in inner.chars() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => direct.push(ch),
            _ => {}
        }
    }
    direct
}

/// Which listing section the entry at `pos` belongs to, judged by the nearest
/// preceding section header.
fn section_before(raw: &str, pos: usize) -> &'static str {
    let prefix = &raw[..pos];
    let plain = prefix.rfind("\"data-source\"");
    let xa = prefix.rfind("\"xa-data-source\"");
    match (plain, xa) {
        (Some(p), Some(x)) if x > p => "xa-data-source",
        (None, Some(_)) => "xa-data-source",
        _ => "data-source",
    }
}

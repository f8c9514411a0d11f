//! Caller-info resolver (external collaborator, spec.md §6).
//!
//! The upstream system (outside this crate's scope per spec.md §1) hands
//! the dispatch engine a raw source-path string and expects back a
//! `(filename, lineno, derived_module_name)` triple. Rust has no dynamic
//! `require`-style module path, so `derived_module_name` here is produced
//! either by resolving a real source path per spec.md's algorithm (used
//! when a path string is all that's available) or, for the common case of
//! a compile-time call site, simply by taking `module_path!()` verbatim
//! with `::` turned into `.` (see [`crate::logger::logger_for_module`]).

/// The result of resolving a raw source-path string.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// The bare filename component.
    pub filename: String,
    /// The derived dotted module identifier.
    pub module: String,
}

/// Resolves a raw source-path string into a derived module identifier,
/// following spec.md §6's algorithm:
///
/// 1. Strip a leading `@`, a leading `[C]`, or a leading `(tail call)`.
/// 2. If the path's last segment is `init.<ext>`, the identifier is the
///    parent directory's basename.
/// 3. Otherwise, if a package-path template with a single `?` placeholder
///    is configured and matches, the identifier is that placeholder
///    segment with path separators turned into dots. Since Rust has no
///    such template system, this crate never configures one and this
///    branch is unreachable in practice — kept for interface parity with
///    external resolvers that might supply one.
/// 4. Otherwise, the identifier is the basename without its extension for
///    source-like files, or the full path with separators turned into
///    dots for anything else.
pub fn resolve(raw_path: &str, package_template: Option<&str>) -> Resolved {
    let stripped = strip_prefix(raw_path);
    let filename = basename(stripped).to_string();

    if let Some(parent_basename) = init_file_parent(stripped) {
        return Resolved { filename, module: parent_basename };
    }

    if let Some(template) = package_template {
        if let Some(module) = match_template(stripped, template) {
            return Resolved { filename, module };
        }
    }

    let module = if is_source_like(stripped) {
        strip_extension(basename(stripped)).to_string()
    } else {
        stripped.replace(['/', '\\'], ".")
    };

    Resolved { filename, module }
}

/// The Rust-native shortcut: derives a dotted module identifier directly
/// from a source file path captured via `file!()`, without the template
/// machinery above (there is no package-path template to consult).
pub fn derive_module_from_path(path: &str) -> String {
    resolve(path, None).module
}

fn strip_prefix(path: &str) -> &str {
    let path = path.strip_prefix('@').unwrap_or(path);
    let path = path.strip_prefix("[C]").unwrap_or(path);
    path.strip_prefix("(tail call)").unwrap_or(path)
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => &name[..idx],
        None => name,
    }
}

fn is_source_like(path: &str) -> bool {
    matches!(extension(path), Some("lua" | "rs" | "py" | "js" | "ts"))
}

fn extension(path: &str) -> Option<&str> {
    basename(path).rsplit('.').next()
}

fn init_file_parent(path: &str) -> Option<String> {
    let base = basename(path);
    let stem = strip_extension(base);
    if stem != "init" {
        return None;
    }
    let dir = path.trim_end_matches(base).trim_end_matches(['/', '\\']);
    Some(basename(dir).to_string())
}

/// Matches `path` against a template containing a single `?` placeholder
/// (e.g. `lib/?.lua`), returning the placeholder segment with separators
/// turned into dots.
fn match_template(path: &str, template: &str) -> Option<String> {
    let idx = template.find('?')?;
    let (prefix, suffix) = (&template[..idx], &template[idx + 1..]);
    let candidate = path.strip_prefix(prefix)?.strip_suffix(suffix)?;
    Some(candidate.replace(['/', '\\'], "."))
}

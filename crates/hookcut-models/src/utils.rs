//! Helpers shared across crates.

use std::collections::BTreeMap;

use url::Url;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Derive the legacy storage key from a clip URL: the URL path without its
/// leading slash. Returns `None` for unparsable URLs or an empty path.
pub fn derive_legacy_key(raw_url: &str) -> Option<String> {
    let url = Url::parse(raw_url).ok()?;
    let path = url.path().trim_start_matches('/');
    if path.is_empty() {
        return None;
    }
    urlencoding::decode(path).ok().map(|p| p.into_owned())
}

/// Flatten `validator` errors into `path -> messages`, using dotted paths for
/// nested structs and `[i]` for list items.
pub fn validation_errors_to_map(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    collect(errors, String::new(), &mut out);
    out
}

fn collect(errors: &ValidationErrors, prefix: String, out: &mut BTreeMap<String, Vec<String>>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                let messages = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(msg) => msg.to_string(),
                        None => e.code.to_string(),
                    })
                    .collect::<Vec<_>>();
                out.entry(path).or_default().extend(messages);
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

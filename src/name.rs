//! Class name normalization and path derivation.
//!
//! Class names arrive in either dotted (`org.example.Foo`) or internal
//! slash form (`org/example/Foo`); all maps in this crate key on the
//! slash form.

/// Normalizes a class name to its internal slash form.
pub fn normalize(class_name: &str) -> String {
    class_name.replace('.', "/")
}

/// Derives the package-relative file path for a class, e.g.
/// `org/example/Foo` -> `org/example/Foo.class`.
pub fn class_file_path(class_name: &str) -> String {
    format!("{}.class", normalize(class_name))
}

/// Returns the package directory of a normalized class name, or `""`
/// for the default package.
pub fn package_path(normalized: &str) -> &str {
    match normalized.rsplit_once('/') {
        Some((package, _)) => package,
        None => "",
    }
}

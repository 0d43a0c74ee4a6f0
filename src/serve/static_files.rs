// src/serve/static_files.rs

//! Resolving request paths against the generated style guide directory.
//!
//! The resolver normalizes the request path, refuses anything that could
//! escape the site root, falls back to `index.html` for directories and picks
//! a content type from the extension. Reading the file happens here too, so
//! the HTTP layer only converts outcomes into responses.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StaticError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("path traversal rejected: {0}")]
    Traversal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A resolved, fully-read file ready to serve.
#[derive(Debug)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl ResolvedFile {
    /// HTML responses get the reload client injected before serving.
    pub fn is_html(&self) -> bool {
        self.content_type.starts_with("text/html")
    }
}

/// Static file resolver rooted at the generated style guide directory.
#[derive(Debug, Clone)]
pub struct StaticSite {
    root: PathBuf,
}

impl StaticSite {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a request path (as it appears in the URL) to a file.
    pub fn resolve(&self, request_path: &str) -> Result<ResolvedFile, StaticError> {
        let clean = normalize_path(request_path)?;
        let full = self.root.join(&clean);

        // Canonicalizing resolves symlinks and `.` segments; a path that does
        // not stay under the root after that is an escape attempt.
        let canonical = full
            .canonicalize()
            .map_err(|_| StaticError::NotFound(request_path.to_string()))?;
        let root_canonical = self.root.canonicalize().map_err(StaticError::Io)?;
        if !canonical.starts_with(&root_canonical) {
            return Err(StaticError::Traversal(request_path.to_string()));
        }

        let target = if canonical.is_dir() {
            let index = canonical.join("index.html");
            if index.is_file() {
                index
            } else {
                return Err(StaticError::NotFound(request_path.to_string()));
            }
        } else if canonical.is_file() {
            canonical
        } else {
            return Err(StaticError::NotFound(request_path.to_string()));
        };

        let extension = target
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let body = std::fs::read(&target)?;
        Ok(ResolvedFile {
            path: target,
            content_type: mime_for(&extension),
            body,
        })
    }
}

/// Strip the leading slash and reject anything suspicious.
fn normalize_path(path: &str) -> Result<String, StaticError> {
    let path = path.trim_start_matches('/');

    if path.contains("..") {
        return Err(StaticError::Traversal(path.to_string()));
    }
    if path.contains('\0') {
        return Err(StaticError::Traversal(path.to_string()));
    }

    Ok(path.to_string())
}

/// Content type for a (lowercased) file extension.
///
/// Covers what a generated style guide actually contains; everything else is
/// served as an opaque octet stream.
pub fn mime_for(extension: &str) -> &'static str {
    match extension {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "eot" => "application/vnd.ms-fontobject",
        "otf" => "font/otf",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Insert a `<script src=...>` tag for the reload client into an HTML page.
///
/// Injected just before `</body>` when present, appended otherwise, so pages
/// the style-guide generator produced without a closing body tag still get
/// live reload.
pub fn inject_reload_script(html: &str, script_src: &str) -> String {
    let tag = format!("<script src=\"{script_src}\"></script>");
    match html.rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..pos]);
            out.push_str(&tag);
            out.push_str(&html[pos..]);
            out
        }
        None => {
            let mut out = String::with_capacity(html.len() + tag.len() + 1);
            out.push_str(html);
            out.push('\n');
            out.push_str(&tag);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn create_site(dir: &Path) -> StaticSite {
        fs::write(dir.join("index.html"), "<html><body>hi</body></html>").unwrap();
        fs::write(dir.join("styles.css"), "body { }").unwrap();

        let sub = dir.join("components");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("index.html"), "<html><body>sub</body></html>").unwrap();
        fs::write(sub.join("logo.png"), [0x89, 0x50, 0x4E, 0x47]).unwrap();

        StaticSite::new(dir)
    }

    #[test]
    fn root_serves_index_html() {
        let temp = TempDir::new().unwrap();
        let site = create_site(temp.path());

        let file = site.resolve("/").unwrap();
        assert!(file.is_html());
        assert!(file.path.ends_with("index.html"));
    }

    #[test]
    fn directory_serves_its_index() {
        let temp = TempDir::new().unwrap();
        let site = create_site(temp.path());

        let file = site.resolve("/components").unwrap();
        assert_eq!(file.body, b"<html><body>sub</body></html>");
    }

    #[test]
    fn css_gets_a_css_content_type() {
        let temp = TempDir::new().unwrap();
        let site = create_site(temp.path());

        let file = site.resolve("/styles.css").unwrap();
        assert!(file.content_type.contains("text/css"));
        assert!(!file.is_html());
    }

    #[test]
    fn missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let site = create_site(temp.path());

        let result = site.resolve("/nope.txt");
        assert!(matches!(result, Err(StaticError::NotFound(_))));
    }

    #[test]
    fn traversal_is_rejected() {
        let temp = TempDir::new().unwrap();
        let site = create_site(temp.path());

        let result = site.resolve("/../../../etc/passwd");
        assert!(matches!(result, Err(StaticError::Traversal(_))));
    }

    #[test]
    fn directory_without_index_is_not_found() {
        let temp = TempDir::new().unwrap();
        let site = create_site(temp.path());
        fs::create_dir_all(temp.path().join("empty")).unwrap();

        let result = site.resolve("/empty");
        assert!(matches!(result, Err(StaticError::NotFound(_))));
    }

    #[test]
    fn injection_lands_before_closing_body() {
        let html = "<html><body><p>x</p></body></html>";
        let out = inject_reload_script(html, "/__musashi/reload.js");
        assert_eq!(
            out,
            "<html><body><p>x</p><script src=\"/__musashi/reload.js\"></script></body></html>"
        );
    }

    #[test]
    fn injection_appends_when_body_tag_is_missing() {
        let out = inject_reload_script("<p>fragment</p>", "/r.js");
        assert!(out.ends_with("<script src=\"/r.js\"></script>"));
        assert!(out.starts_with("<p>fragment</p>"));
    }
}

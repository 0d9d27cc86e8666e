//! Path resolution against the document root
//!
//! Maps one request path to a redirect, a static file, a script endpoint or
//! nothing. The order of checks matters: literal files win over redirects,
//! redirects win over aliases, aliases win over the `.html` probe.

use super::table::{self, Script};
use crate::logger;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 301 to the given location
    Redirect(String),
    /// Canonical path of an existing regular file inside the root
    File(PathBuf),
    Script(Script),
    NotFound,
}

#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
}

impl Resolver {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn resolve(&self, raw_path: &str) -> Resolution {
        let path = urlencoding::decode(raw_path).map_or(Cow::Borrowed(raw_path), |p| p);

        if path != "/" && path.ends_with('/') {
            return Resolution::Redirect(slash_trimmed_location(&path));
        }

        if path != "/" {
            if let Some(script) = table::script(&path) {
                return Resolution::Script(script);
            }
            if let Some(file) = self.existing_file(&path) {
                return Resolution::File(file);
            }
        }

        let lower = path.to_lowercase();
        if let Some(target) = table::legacy_redirect(&lower) {
            return Resolution::Redirect(target.to_string());
        }

        let target: Cow<'_, str> = if path == "/" || path.is_empty() {
            Cow::Borrowed("/index.html")
        } else if let Some(alias) = table::clean_route(&lower) {
            Cow::Borrowed(alias)
        } else if !path.ends_with(".html") && self.existing_file(&format!("{path}.html")).is_some()
        {
            Cow::Owned(format!("{path}.html"))
        } else {
            path
        };

        if let Some(script) = table::script(&target) {
            return Resolution::Script(script);
        }
        self.existing_file(&target)
            .map_or(Resolution::NotFound, Resolution::File)
    }

    /// Regular file under the root for a URL path, never escaping the root
    pub fn existing_file(&self, url_path: &str) -> Option<PathBuf> {
        let relative = url_path.trim_start_matches('/');
        if relative.contains('\0') || relative.split(['/', '\\']).any(|seg| seg == "..") {
            logger::log_warning(&format!("Rejected path with parent segment: {url_path}"));
            return None;
        }

        // missing files are the common 404 case, not worth a log line
        let canonical = self.root.join(relative).canonicalize().ok()?;
        let root = match self.root.canonicalize() {
            Ok(r) => r,
            Err(e) => {
                logger::log_warning(&format!(
                    "Document root '{}' inaccessible: {e}",
                    self.root.display()
                ));
                return None;
            }
        };
        if !canonical.starts_with(&root) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {url_path} -> {}",
                canonical.display()
            ));
            return None;
        }

        canonical.is_file().then_some(canonical)
    }
}

/// Redirect target for a decoded path ending in `/`.
///
/// Always a single leading slash, so `//host/` cannot become a
/// protocol-relative URL, and re-encoded so an encoded `%2F` cannot loop.
fn slash_trimmed_location(decoded: &str) -> String {
    let trimmed = decoded.trim_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    trimmed.split('/').fold(String::new(), |mut location, segment| {
        location.push('/');
        location.push_str(&urlencoding::encode(segment));
        location
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> (TempDir, Resolver) {
        let dir = tempfile::tempdir().unwrap();
        for page in [
            "index.html",
            "kontakt.html",
            "persoenliche.html",
            "galerie.html",
            "404.html",
        ] {
            fs::write(dir.path().join(page), page).unwrap();
        }
        fs::create_dir(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("css/style.css"), "body{}").unwrap();
        let resolver = Resolver::new(dir.path());
        (dir, resolver)
    }

    fn file(dir: &TempDir, name: &str) -> Resolution {
        Resolution::File(dir.path().join(name).canonicalize().unwrap())
    }

    #[test]
    fn test_clean_url_matches_literal_file() {
        let (dir, r) = site();
        assert_eq!(r.resolve("/kontakt"), file(&dir, "kontakt.html"));
        assert_eq!(r.resolve("/kontakt.html"), file(&dir, "kontakt.html"));
        assert_eq!(r.resolve("/KONTAKT"), file(&dir, "kontakt.html"));
    }

    #[test]
    fn test_trailing_slash_redirects() {
        let (_dir, r) = site();
        assert_eq!(r.resolve("/kontakt/"), Resolution::Redirect("/kontakt".into()));
        assert_eq!(r.resolve("//"), Resolution::Redirect("/".into()));
    }

    #[test]
    fn test_trailing_slash_redirect_stays_on_site() {
        let (_dir, r) = site();
        for raw in [
            "//evil.example/",
            "////evil.example/x/",
            "/a//b/",
            "/kontakt%2F",
            "/%2F%2Fevil.example%2F",
        ] {
            let Resolution::Redirect(location) = r.resolve(raw) else {
                panic!("{raw} should redirect");
            };
            assert!(location.starts_with('/'), "{raw} -> {location}");
            assert!(!location.starts_with("//"), "{raw} -> {location}");
            assert!(!location.ends_with('/') || location == "/", "{raw} -> {location}");
        }
        assert_eq!(r.resolve("/kontakt%2F"), Resolution::Redirect("/kontakt".into()));
        assert_eq!(
            r.resolve("/%C3%BCber%20uns/"),
            Resolution::Redirect("/%C3%BCber%20uns".into())
        );
    }

    #[test]
    fn test_root_serves_index() {
        let (dir, r) = site();
        assert_eq!(r.resolve("/"), file(&dir, "index.html"));
    }

    #[test]
    fn test_legacy_redirect_is_case_insensitive() {
        let (dir, r) = site();
        assert_eq!(
            r.resolve("/Persoenliche"),
            Resolution::Redirect("/Leistungen/Persoenliche".into())
        );
        assert_eq!(
            r.resolve("/Leistungen/Persoenliche"),
            file(&dir, "persoenliche.html")
        );
    }

    #[test]
    fn test_html_probe_and_assets() {
        let (dir, r) = site();
        assert_eq!(r.resolve("/galerie"), file(&dir, "galerie.html"));
        assert_eq!(r.resolve("/css/style.css"), file(&dir, "css/style.css"));
    }

    #[test]
    fn test_scripts_resolve_without_files() {
        let (_dir, r) = site();
        assert_eq!(
            r.resolve("/api/get-csrf-token.php"),
            Resolution::Script(Script::CsrfToken)
        );
    }

    #[test]
    fn test_unknown_and_escaping_paths_not_found() {
        let (_dir, r) = site();
        assert_eq!(r.resolve("/gibt-es-nicht"), Resolution::NotFound);
        assert_eq!(r.resolve("/css"), Resolution::NotFound);
        assert_eq!(r.resolve("/../etc/passwd"), Resolution::NotFound);
        assert_eq!(r.resolve("/%2e%2e/etc/passwd"), Resolution::NotFound);
    }

    #[test]
    fn test_percent_encoded_path() {
        let (dir, r) = site();
        fs::write(dir.path().join("über uns.html"), "x").unwrap();
        assert_eq!(r.resolve("/%C3%BCber%20uns"), file(&dir, "über uns.html"));
    }
}

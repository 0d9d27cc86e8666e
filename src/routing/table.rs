//! Compiled-in route tables
//!
//! Clean URLs and legacy redirects are matched case-insensitively against
//! the lowercased request path; script endpoints match exactly.

/// Clean path → page file
pub const CLEAN_ROUTES: &[(&str, &str)] = &[
    ("/kontakt", "/kontakt.html"),
    ("/leistungen", "/leistungen.html"),
    ("/ueber-uns", "/ueber-uns.html"),
    ("/impressum", "/impressum.html"),
    ("/datenschutz", "/datenschutz.html"),
    ("/leistungen/persoenliche", "/persoenliche.html"),
    (
        "/leistungen/schul-individual-begleitung",
        "/schul-individual-begleitung.html",
    ),
    ("/leistungen/personliches-budget", "/personliches-budget.html"),
];

/// Legacy path → permanent redirect target
pub const LEGACY_REDIRECTS: &[(&str, &str)] = &[
    ("/persoenliche", "/Leistungen/Persoenliche"),
    (
        "/schul-individual-begleitung",
        "/Leistungen/Schul-Individual-Begleitung",
    ),
    ("/personliches-budget", "/Leistungen/Personliches-Budget"),
];

/// Server-side endpoints living under the document root's URL space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    CsrfToken,
    ContactHandler,
}

pub const SCRIPTS: &[(&str, Script)] = &[
    ("/api/get-csrf-token.php", Script::CsrfToken),
    ("/api/contact-handler.php", Script::ContactHandler),
];

fn lookup<T: Copy>(table: &[(&str, T)], key: &str) -> Option<T> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

pub fn clean_route(lower_path: &str) -> Option<&'static str> {
    lookup(CLEAN_ROUTES, lower_path)
}

pub fn legacy_redirect(lower_path: &str) -> Option<&'static str> {
    lookup(LEGACY_REDIRECTS, lower_path)
}

pub fn script(path: &str) -> Option<Script> {
    lookup(SCRIPTS, path)
}

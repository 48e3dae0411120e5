//! Local path derivation for captured pages and assets
//!
//! Both derivations are pure functions of the source URL, so repeated
//! encounters with the same URL land on the same file.
//!
//! Known limitation: a directory-style page URL (`/docs/`) and its
//! explicit `/docs/index.html` sibling map to the same file, so the
//! later capture wins.
//!
//! Rewritten asset references are relative to the job root (`assets/...`),
//! so a page stored below the root (e.g. `blog/post.html`) resolves them
//! against its own directory when opened in place.

use url::Url;

/// Relative path of a captured page within the job directory
///
/// Root maps to `index.html`, directory-style URLs get `index.html`
/// appended, extensionless paths get `.html` appended.
pub fn page_local_path(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() || path == "/" {
        return "index.html".to_string();
    }

    let trimmed = path.trim_start_matches('/');
    if path.ends_with('/') {
        return format!("{}index.html", trimmed);
    }

    let file_name = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if file_name.contains('.') {
        trimmed.to_string()
    } else {
        format!("{}.html", trimmed)
    }
}

/// Relative path of a captured asset within the job directory
///
/// The URL path goes under `assets/` as-is. A query string is folded
/// into the file name as `_<hash8>` before the extension, so
/// `a.png?v=2` and `a.png?v=3` occupy distinct, stable paths.
pub fn asset_local_path(url: &Url) -> String {
    let trimmed = url.path().trim_start_matches('/');
    let local = format!("assets/{}", trimmed);

    match url.query() {
        None | Some("") => local,
        Some(query) => {
            let tag = format!("_{}", hash8(query));
            let (dir, file_name) = match local.rfind('/') {
                Some(idx) => local.split_at(idx + 1),
                None => ("", local.as_str()),
            };
            match file_name.rfind('.') {
                Some(dot) => format!("{}{}{}{}", dir, &file_name[..dot], tag, &file_name[dot..]),
                None => format!("{}{}{}", dir, file_name, tag),
            }
        }
    }
}

/// 8 hex chars of a 32-bit FNV-1a hash
fn hash8(input: &str) -> String {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 16_777_619;

    let mut hash = OFFSET_BASIS;
    for byte in input.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    format!("{:08x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_root_is_index_html() {
        assert_eq!(page_local_path(&parse("https://ex.test/")), "index.html");
        assert_eq!(page_local_path(&parse("https://ex.test")), "index.html");
    }

    #[test]
    fn test_extensionless_page_gets_html_suffix() {
        assert_eq!(page_local_path(&parse("https://ex.test/about")), "about.html");
        assert_eq!(
            page_local_path(&parse("https://ex.test/docs/guide")),
            "docs/guide.html"
        );
    }

    #[test]
    fn test_directory_page_gets_index_html() {
        assert_eq!(
            page_local_path(&parse("https://ex.test/docs/")),
            "docs/index.html"
        );
    }

    #[test]
    fn test_page_with_extension_keeps_it() {
        assert_eq!(
            page_local_path(&parse("https://ex.test/a/b.html")),
            "a/b.html"
        );
        assert_eq!(page_local_path(&parse("https://ex.test/feed.xml")), "feed.xml");
    }

    #[test]
    fn test_directory_url_collides_with_explicit_index() {
        // Known limitation, kept deliberately
        let a = page_local_path(&parse("https://ex.test/docs/"));
        let b = page_local_path(&parse("https://ex.test/docs/index.html"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_trailing_slash_variants() {
        assert_eq!(page_local_path(&parse("https://ex.test/about")), "about.html");
        assert_eq!(
            page_local_path(&parse("https://ex.test/about/")),
            "about/index.html"
        );
    }

    #[test]
    fn test_asset_path_goes_under_assets() {
        assert_eq!(
            asset_local_path(&parse("https://ex.test/img/a.png")),
            "assets/img/a.png"
        );
        assert_eq!(
            asset_local_path(&parse("https://ex.test/style.css")),
            "assets/style.css"
        );
    }

    #[test]
    fn test_query_string_folds_into_name_before_extension() {
        let with_query = asset_local_path(&parse("https://ex.test/img/a.png?v=2"));
        assert!(with_query.starts_with("assets/img/a_"));
        assert!(with_query.ends_with(".png"));
        assert_ne!(with_query, "assets/img/a.png");
    }

    #[test]
    fn test_query_variants_get_distinct_stable_paths() {
        let v2a = asset_local_path(&parse("https://ex.test/img/a.png?v=2"));
        let v2b = asset_local_path(&parse("https://ex.test/img/a.png?v=2"));
        let v3 = asset_local_path(&parse("https://ex.test/img/a.png?v=3"));
        assert_eq!(v2a, v2b);
        assert_ne!(v2a, v3);
    }

    #[test]
    fn test_query_on_extensionless_asset_appends_tag() {
        let path = asset_local_path(&parse("https://ex.test/font?family=Inter"));
        assert!(path.starts_with("assets/font_"));
        assert!(!path.contains('.'));
    }

    #[test]
    fn test_derivations_are_deterministic() {
        for url in [
            "https://ex.test/",
            "https://ex.test/a/b/c",
            "https://ex.test/x.png?q=1&r=2",
        ] {
            let parsed = parse(url);
            assert_eq!(page_local_path(&parsed), page_local_path(&parsed));
            assert_eq!(asset_local_path(&parsed), asset_local_path(&parsed));
        }
    }

    #[test]
    fn test_hash8_is_eight_lower_hex_chars() {
        for query in ["v=2", "v=3", "", "a=1&b=2"] {
            let tag = hash8(query);
            assert_eq!(tag.len(), 8);
            assert!(tag.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}

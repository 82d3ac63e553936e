//! Glob-to-regex translation for `blockedGlobs` matching.
//!
//! `**` matches any sequence including `/`; `*` matches any sequence
//! excluding `/`; other regex metacharacters are escaped literally. The
//! translated pattern is anchored on both ends.

use regex::Regex;

const fn is_regex_meta(c: char) -> bool {
    matches!(
        c,
        '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\'
    )
}

fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = std::env::var_os("HOME") {
            let home = home.to_string_lossy().into_owned();
            return format!("{home}{rest}");
        }
    }
    path.to_string()
}

/// Translate a glob pattern into an anchored, case-sensitive regex.
fn glob_to_regex(glob: &str) -> Option<Regex> {
    let glob = expand_home(glob);
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    let chars: Vec<char> = glob.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                out.push_str(".*");
                i += 2;
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c if is_regex_meta(c) => {
                out.push('\\');
                out.push(c);
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out.push('$');
    Regex::new(&out).ok()
}

/// Match `candidate_path` against a single blocked-glob pattern.
#[must_use]
pub fn matches(candidate_path: &str, glob: &str) -> bool {
    match glob_to_regex(glob) {
        Some(re) => re.is_match(candidate_path),
        None => false,
    }
}

/// Scan `blocked_globs` in order and return the first one that matches
/// `candidate_path`, if any.
#[must_use]
pub fn first_match<'a>(candidate_path: &str, blocked_globs: &'a [String]) -> Option<&'a str> {
    blocked_globs.iter().map(String::as_str).find(|g| matches(candidate_path, g))
}

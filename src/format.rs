//! `{key}` format strings for line oriented output.

use std::collections::BTreeMap;

/// A lookup map that answers every missing key with one fixed default.
#[derive(Debug, Clone)]
pub struct DefaultMap<'a> {
    values: &'a BTreeMap<String, String>,
    default: &'a str,
}

impl<'a> DefaultMap<'a> {
    #[must_use]
    pub const fn new(values: &'a BTreeMap<String, String>, default: &'a str) -> Self {
        Self { values, default }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> &'a str {
        self.values.get(key).map_or(self.default, String::as_str)
    }

    /// Render `template`, replacing each `{key}` with its value.
    /// `{{` and `}}` are literal braces. An unterminated `{` is copied as is.
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            match c {
                '{' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek().is_some_and(|&(_, n)| n == '}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    if let Some(len) = template[i + 1..].find('}') {
                        out.push_str(self.get(&template[i + 1..i + 1 + len]));
                        // skip the key and the closing brace
                        for _ in 0..=template[i + 1..i + 1 + len].chars().count() {
                            chars.next();
                        }
                    } else {
                        out.push_str(&template[i..]);
                        break;
                    }
                }
                _ => out.push(c),
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> BTreeMap<String, String> {
        [("scm", "git"), ("url", "https://example.com/a.git"), ("dir", ".")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_keys_use_default() {
        let values = values();
        let map = DefaultMap::new(&values, "-");

        assert_eq!(map.get("scm"), "git");
        assert_eq!(map.get("branch"), "-");
    }

    #[test]
    fn renders_templates() {
        let values = values();
        let map = DefaultMap::new(&values, "");

        assert_eq!(
            map.render("{scm} pkg {dir} {url} {branch}"),
            "git pkg . https://example.com/a.git "
        );
        assert_eq!(map.render("{{literal}} {scm}"), "{literal} git");
        assert_eq!(map.render("open {scm"), "open {scm");
        assert_eq!(map.render("ünïcode {dir}/x"), "ünïcode ./x");
    }
}

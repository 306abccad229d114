use std::{collections::BTreeMap, fmt};

/// Content-derived identity of a package variant.
///
/// Two packages with the same `VariantId` are interchangeable and are only
/// ever represented once in a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantId([u8; 32]);

impl VariantId {
    /// Hash a recipe name together with its resolved parameters.
    ///
    /// The parameters are sorted before hashing, so the iteration order of
    /// `params` never changes the result. Every field is length prefixed,
    /// which keeps `("ab", "c")` and `("a", "bc")` apart.
    pub fn compute<'a, I>(recipe_name: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let sorted: BTreeMap<&str, &str> = params.into_iter().collect();

        let mut hash = blake3::Hasher::new();
        write_field(&mut hash, recipe_name);
        hash.update(&(sorted.len() as u64).to_le_bytes());
        for (key, value) in sorted {
            write_field(&mut hash, key);
            write_field(&mut hash, value);
        }

        Self(*hash.finalize().as_bytes())
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First 8 hex digits, for log messages.
    #[must_use]
    pub fn short(&self) -> String {
        self.to_string()[..8].to_string()
    }
}

fn write_field(hash: &mut blake3::Hasher, field: &str) {
    hash.update(&(field.len() as u64).to_le_bytes());
    hash.update(field.as_bytes());
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_independent() {
        let a = VariantId::compute("libfoo", [("ARCH", "x86"), ("DEBUG", "1")]);
        let b = VariantId::compute("libfoo", [("DEBUG", "1"), ("ARCH", "x86")]);

        assert_eq!(a, b);
    }

    #[test]
    fn sensitive_to_every_input() {
        let base = VariantId::compute("libfoo", [("ARCH", "x86")]);

        assert_ne!(base, VariantId::compute("libbar", [("ARCH", "x86")]));
        assert_ne!(base, VariantId::compute("libfoo", [("ARCH", "arm")]));
        assert_ne!(base, VariantId::compute("libfoo", [("ARCH", "x86"), ("X", "")]));
        assert_ne!(base, VariantId::compute("libfoo", []));
    }

    #[test]
    fn field_boundaries_matter() {
        let a = VariantId::compute("r", [("AB", "C")]);
        let b = VariantId::compute("r", [("A", "BC")]);
        let c = VariantId::compute("rA", [("B", "C")]);

        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_is_hex() {
        let id = VariantId::compute("libfoo", []);
        let hex = id.to_string();

        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id.short(), hex[..8]);
    }
}

//! Environment maps and `${VAR}` substitution.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, de::Error as _};

use crate::error::RecipeError;

pub type Env = BTreeMap<String, String>;

/// A YAML scalar read as a string, so `tag: 1.0` or `revision: 42` work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Scalar(pub(crate) String);

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_yaml::Value::deserialize(deserializer)? {
            serde_yaml::Value::String(s) => Ok(Self(s)),
            serde_yaml::Value::Number(n) => Ok(Self(n.to_string())),
            serde_yaml::Value::Bool(b) => Ok(Self(b.to_string())),
            other => Err(D::Error::custom(format!(
                "expected a string, number or bool, found {other:?}"
            ))),
        }
    }
}

pub(crate) fn scalars(map: BTreeMap<String, Scalar>) -> Env {
    map.into_iter().map(|(key, Scalar(value))| (key, value)).collect()
}

/// Expand `${VAR}` and `${VAR:-default}` in `template` from `env`.
/// `$$` is a literal dollar sign.
///
/// # Errors
///
/// - A referenced variable is not set and has no default
/// - Unterminated `${`
pub fn substitute(recipe: &str, template: &str, env: &Env) -> Result<String, RecipeError> {
    let malformed = || RecipeError::MalformedSubstitution {
        recipe: recipe.to_string(),
        template: template.to_string(),
    };

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];

        if let Some(after) = rest.strip_prefix('$') {
            out.push('$');
            rest = after;
        } else if let Some(after) = rest.strip_prefix('{') {
            let end = after.find('}').ok_or_else(malformed)?;
            let expr = &after[..end];
            rest = &after[end + 1..];

            let (name, default) = match expr.split_once(":-") {
                Some((name, default)) => (name, Some(default)),
                None => (expr, None),
            };
            if !is_var_name(name) {
                return Err(malformed());
            }

            match (env.get(name), default) {
                (Some(value), _) => out.push_str(value),
                (None, Some(default)) => out.push_str(default),
                (None, None) => {
                    return Err(RecipeError::UndefinedVariable {
                        recipe: recipe.to_string(),
                        variable: name.to_string(),
                    });
                }
            }
        } else {
            return Err(malformed());
        }
    }
    out.push_str(rest);

    Ok(out)
}

/// `[A-Za-z_][A-Za-z0-9_]*`
#[must_use]
pub fn is_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse `-D` style defines. `VAR` alone means an empty value.
///
/// # Errors
///
/// - A define contains more than one `=`
/// - The name isn't a valid variable name
pub fn parse_defines<S: AsRef<str>>(defines: &[S]) -> Result<Env, RecipeError> {
    let mut env = Env::new();

    for define in defines {
        let define = define.as_ref();
        let parts: Vec<&str> = define.split('=').collect();
        let (name, value) = match parts.as_slice() {
            [name] => (*name, ""),
            [name, value] => (*name, *value),
            _ => return Err(RecipeError::MalformedDefine(define.to_string())),
        };
        if !is_var_name(name) {
            return Err(RecipeError::MalformedDefine(define.to_string()));
        }
        env.insert(name.to_string(), value.to_string());
    }

    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Env {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn substitutes_variables() -> Result<(), RecipeError> {
        let env = env(&[("VERSION", "1.2"), ("NAME", "zlib")]);

        assert_eq!(
            substitute("r", "https://example.com/${NAME}-${VERSION}.tar", &env)?,
            "https://example.com/zlib-1.2.tar"
        );
        assert_eq!(substitute("r", "no vars", &env)?, "no vars");
        assert_eq!(substitute("r", "cost: $$5", &env)?, "cost: $5");

        Ok(())
    }

    #[test]
    fn default_values() -> Result<(), RecipeError> {
        let env = env(&[("SET", "yes")]);

        assert_eq!(substitute("r", "${SET:-no}", &env)?, "yes");
        assert_eq!(substitute("r", "${UNSET:-no}", &env)?, "no");
        assert_eq!(substitute("r", "${UNSET:-}", &env)?, "");

        Ok(())
    }

    #[test]
    fn undefined_and_malformed() {
        let env = Env::new();

        assert!(matches!(
            substitute("r", "${MISSING}", &env),
            Err(RecipeError::UndefinedVariable { variable, .. }) if variable == "MISSING"
        ));
        assert!(matches!(
            substitute("r", "${OPEN", &env),
            Err(RecipeError::MalformedSubstitution { .. })
        ));
        assert!(matches!(
            substitute("r", "$NAME", &env),
            Err(RecipeError::MalformedSubstitution { .. })
        ));
        assert!(matches!(
            substitute("r", "${1BAD}", &env),
            Err(RecipeError::MalformedSubstitution { .. })
        ));
    }

    #[test]
    fn defines() -> Result<(), RecipeError> {
        let parsed = parse_defines(&["A=1", "B", "C="])?;

        assert_eq!(parsed, env(&[("A", "1"), ("B", ""), ("C", "")]));
        assert!(matches!(
            parse_defines(&["A=1=2"]),
            Err(RecipeError::MalformedDefine(define)) if define == "A=1=2"
        ));
        assert!(parse_defines(&["@sandbox=1"]).is_err());
        assert!(parse_defines(&["=1"]).is_err());

        Ok(())
    }
}

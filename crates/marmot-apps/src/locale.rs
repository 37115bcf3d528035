//! Locale-suffix resolution for localized desktop-entry keys.

use std::env;

/// Ordered locale suffix candidates for `Key[suffix]=` lookups.
///
/// Built once from the ambient locale. For `lang_COUNTRY.ENCODING@MODIFIER`
/// the candidates are `lang_COUNTRY@MODIFIER`, `lang_COUNTRY`,
/// `lang@MODIFIER`, `lang`, in that order; the encoding never participates
/// in matching and the unsuffixed key is the final fallback.
#[derive(Debug, Clone, Default)]
pub struct LocaleSuffixes {
    suffixes: Vec<String>,
}

impl LocaleSuffixes {
    /// Read the locale from the environment (`LC_ALL`, `LC_MESSAGES`,
    /// `LANG`, first one set wins).
    pub fn from_environment() -> Self {
        for var in ["LC_ALL", "LC_MESSAGES", "LANG"] {
            match env::var(var) {
                Ok(value) if !value.is_empty() => return Self::from_locale(&value),
                _ => {}
            }
        }
        Self::default()
    }

    /// Build the candidate list from an explicit locale string.
    pub fn from_locale(locale: &str) -> Self {
        let (base, modifier) = match locale.split_once('@') {
            Some((base, modifier)) if !modifier.is_empty() => (base, Some(modifier)),
            Some((base, _)) => (base, None),
            None => (locale, None),
        };
        // Strip the encoding.
        let base = base.split('.').next().unwrap_or(base);
        let (lang, country) = match base.split_once('_') {
            Some((lang, country)) if !country.is_empty() => (lang, Some(country)),
            Some((lang, _)) => (lang, None),
            None => (base, None),
        };

        let mut suffixes = Vec::with_capacity(4);
        if lang.is_empty() || lang == "C" || lang == "POSIX" {
            return Self { suffixes };
        }

        if let (Some(country), Some(modifier)) = (country, modifier) {
            suffixes.push(format!("{lang}_{country}@{modifier}"));
        }
        if let Some(country) = country {
            suffixes.push(format!("{lang}_{country}"));
        }
        if let Some(modifier) = modifier {
            suffixes.push(format!("{lang}@{modifier}"));
        }
        suffixes.push(lang.to_string());

        Self { suffixes }
    }

    /// The candidates in match order, most specific first. The implicit
    /// empty suffix (the unsuffixed key) is not included.
    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffixes(locale: &str) -> Vec<String> {
        LocaleSuffixes::from_locale(locale).suffixes().to_vec()
    }

    #[test]
    fn full_locale() {
        assert_eq!(
            suffixes("sr_RS.UTF-8@latin"),
            vec!["sr_RS@latin", "sr_RS", "sr@latin", "sr"]
        );
    }

    #[test]
    fn lang_and_country() {
        assert_eq!(suffixes("de_DE.UTF-8"), vec!["de_DE", "de"]);
        assert_eq!(suffixes("de_DE"), vec!["de_DE", "de"]);
    }

    #[test]
    fn lang_only() {
        assert_eq!(suffixes("fi"), vec!["fi"]);
        assert_eq!(suffixes("fi.UTF-8"), vec!["fi"]);
    }

    #[test]
    fn lang_and_modifier() {
        assert_eq!(suffixes("ca@valencia"), vec!["ca@valencia", "ca"]);
    }

    #[test]
    fn c_locale_has_no_suffixes() {
        assert!(suffixes("C").is_empty());
        assert!(suffixes("C.UTF-8").is_empty());
        assert!(suffixes("POSIX").is_empty());
        assert!(suffixes("").is_empty());
    }
}

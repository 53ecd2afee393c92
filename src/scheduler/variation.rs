//! Query-term variation.
//!
//! Small random edits to the search term so the same keyword is not sent
//! byte-for-byte on every pass. Has no effect on filtering; records are
//! still tagged with the original keyword.

use rand::Rng;

use crate::config::VariationConfig;

/// Which edit, if any, was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    Unchanged,
    Qualifier(String),
    Suffix(String),
    /// The character at this char index was dropped.
    Typo(usize),
}

#[derive(Clone, Copy)]
enum Edit {
    Qualifier,
    Suffix,
    Typo,
}

/// Keywords shorter than this are never given a typo.
const MIN_TYPO_CHARS: usize = 4;

/// Possibly vary `keyword`.
///
/// Each edit fires independently with its own probability; when more than
/// one fires, one of them is picked uniformly so at most one is applied.
pub fn vary_keyword<R: Rng + ?Sized>(
    keyword: &str,
    config: &VariationConfig,
    rng: &mut R,
) -> (String, Variant) {
    let qualifier = rng.gen_bool(config.qualifier_probability) && !config.qualifiers.is_empty();
    let suffix = rng.gen_bool(config.suffix_probability) && !config.suffixes.is_empty();
    let typo = rng.gen_bool(config.typo_probability) && !typo_positions(keyword).is_empty();

    let fired: Vec<Edit> = [
        (qualifier, Edit::Qualifier),
        (suffix, Edit::Suffix),
        (typo, Edit::Typo),
    ]
    .into_iter()
    .filter_map(|(hit, kind)| hit.then_some(kind))
    .collect();
    if fired.is_empty() {
        return (keyword.to_owned(), Variant::Unchanged);
    }

    match fired[rng.gen_range(0..fired.len())] {
        Edit::Qualifier => {
            let word = &config.qualifiers[rng.gen_range(0..config.qualifiers.len())];
            (format!("{word} {keyword}"), Variant::Qualifier(word.clone()))
        }
        Edit::Suffix => {
            let word = &config.suffixes[rng.gen_range(0..config.suffixes.len())];
            (format!("{keyword} {word}"), Variant::Suffix(word.clone()))
        }
        Edit::Typo => {
            let positions = typo_positions(keyword);
            let drop = positions[rng.gen_range(0..positions.len())];
            let varied = keyword
                .chars()
                .enumerate()
                .filter(|(i, _)| *i != drop)
                .map(|(_, c)| c)
                .collect();
            (varied, Variant::Typo(drop))
        }
    }
}

/// Char indices eligible for deletion: non-whitespace, in keywords long
/// enough to stay recognisable.
fn typo_positions(keyword: &str) -> Vec<usize> {
    if keyword.chars().count() < MIN_TYPO_CHARS {
        return Vec::new();
    }
    keyword
        .chars()
        .enumerate()
        .filter(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config(q: f64, s: f64, t: f64) -> VariationConfig {
        VariationConfig {
            qualifier_probability: q,
            suffix_probability: s,
            typo_probability: t,
            qualifiers: vec!["latest".into()],
            suffixes: vec!["news".into()],
        }
    }

    #[test]
    fn zero_probabilities_leave_keyword_alone() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let (term, variant) = vary_keyword("defi", &config(0.0, 0.0, 0.0), &mut rng);
            assert_eq!(term, "defi");
            assert_eq!(variant, Variant::Unchanged);
        }
    }

    #[test]
    fn certain_qualifier_is_prepended() {
        let mut rng = StdRng::seed_from_u64(1);
        let (term, variant) = vary_keyword("defi", &config(1.0, 0.0, 0.0), &mut rng);
        assert_eq!(term, "latest defi");
        assert_eq!(variant, Variant::Qualifier("latest".into()));
    }

    #[test]
    fn certain_suffix_is_appended() {
        let mut rng = StdRng::seed_from_u64(1);
        let (term, _) = vary_keyword("smart contract", &config(0.0, 1.0, 0.0), &mut rng);
        assert_eq!(term, "smart contract news");
    }

    #[test]
    fn typo_drops_exactly_one_character() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            let (term, variant) = vary_keyword("ethereum", &config(0.0, 0.0, 1.0), &mut rng);
            assert_eq!(term.chars().count(), 7);
            let Variant::Typo(index) = variant else {
                panic!("expected a typo, got {variant:?}");
            };
            let mut expected: Vec<char> = "ethereum".chars().collect();
            expected.remove(index);
            assert_eq!(term, expected.into_iter().collect::<String>());
        }
    }

    #[test]
    fn short_keywords_never_get_typos() {
        let mut rng = StdRng::seed_from_u64(5);
        let (term, variant) = vary_keyword("eth", &config(0.0, 0.0, 1.0), &mut rng);
        assert_eq!(term, "eth");
        assert_eq!(variant, Variant::Unchanged);
    }

    #[test]
    fn at_most_one_edit_when_all_fire() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let (term, variant) = vary_keyword("bitcoin", &config(1.0, 1.0, 1.0), &mut rng);
            match variant {
                Variant::Qualifier(_) => assert_eq!(term, "latest bitcoin"),
                Variant::Suffix(_) => assert_eq!(term, "bitcoin news"),
                Variant::Typo(_) => assert_eq!(term.chars().count(), 6),
                Variant::Unchanged => panic!("an edit must be applied"),
            }
        }
    }

    #[test]
    fn empty_word_lists_disable_their_edits() {
        let mut rng = StdRng::seed_from_u64(2);
        let cfg = VariationConfig {
            qualifiers: Vec::new(),
            suffixes: Vec::new(),
            ..config(1.0, 1.0, 0.0)
        };
        let (term, variant) = vary_keyword("bitcoin", &cfg, &mut rng);
        assert_eq!(term, "bitcoin");
        assert_eq!(variant, Variant::Unchanged);
    }
}

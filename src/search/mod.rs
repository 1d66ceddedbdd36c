pub mod phrase;
pub mod result;

pub use phrase::{Operator, SearchPhrase, SearchTerm, normalize};
pub use result::{SearchResult, combine_results_with_and, take_all_results};

use im::OrdMap;
use std::ops::Bound;

/// Collects every value whose (normalized) key matches `phrase`.
///
/// Exact and prefix lookups walk only the matching key range; suffix and
/// substring lookups scan all keys.
pub fn find_by_key<'a, V>(
    index: &'a OrdMap<String, V>,
    phrase: &SearchPhrase,
) -> Vec<&'a V>
where
    V: Clone,
{
    let text = phrase.text();
    match phrase.operator() {
        Operator::Equals => index.get(text).into_iter().collect(),
        Operator::StartsWith => index
            .range::<_, str>((Bound::Included(text), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(text))
            .map(|(_, value)| value)
            .collect(),
        Operator::EndsWith | Operator::Contains => index
            .iter()
            .filter(|(key, _)| phrase.matches(key))
            .map(|(_, value)| value)
            .collect(),
    }
}

/// A read-model index that answers pattern queries.
pub trait Lookup<T: Ord + Clone> {
    fn by_exact_or_pattern(&self, phrase: &SearchPhrase) -> SearchResult<T>;

    /// Synonym search on one field: matches of any phrase.
    fn by_any(&self, phrases: &[SearchPhrase]) -> SearchResult<T> {
        take_all_results(phrases.iter().map(|phrase| self.by_exact_or_pattern(phrase)))
    }

    /// `NotUsed` when no phrase was supplied.
    fn by_optional(&self, phrase: Option<&SearchPhrase>) -> SearchResult<T> {
        match phrase {
            Some(phrase) => self.by_exact_or_pattern(phrase),
            None => SearchResult::NotUsed,
        }
    }
}

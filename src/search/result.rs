use std::collections::BTreeSet;

/// Outcome of evaluating one (possibly absent) search filter.
///
/// `NotUsed` and `NoResult` must stay distinct: an omitted filter is the
/// identity of an AND-combination, an empty match absorbs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResult<T: Ord> {
    /// Filter evaluated and matched at least one item.
    Results(BTreeSet<T>),
    /// Filter evaluated and matched nothing.
    NoResult,
    /// Filter not supplied.
    NotUsed,
}

impl<T: Ord> SearchResult<T> {
    /// Wraps an evaluated match set; an empty set becomes `NoResult`.
    pub fn from_results<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let set: BTreeSet<T> = items.into_iter().collect();
        if set.is_empty() {
            SearchResult::NoResult
        } else {
            SearchResult::Results(set)
        }
    }

    /// `None` means the filter was not supplied.
    pub fn from_option<I>(items: Option<I>) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        match items {
            Some(items) => Self::from_results(items),
            None => SearchResult::NotUsed,
        }
    }

    pub fn is_used(&self) -> bool {
        !matches!(self, SearchResult::NotUsed)
    }

    pub fn value(&self) -> Option<&BTreeSet<T>> {
        match self {
            SearchResult::Results(set) => Some(set),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<BTreeSet<T>> {
        match self {
            SearchResult::Results(set) => Some(set),
            _ => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> SearchResult<U>
    where
        U: Ord,
        F: FnMut(T) -> U,
    {
        match self {
            SearchResult::Results(set) => SearchResult::from_results(set.into_iter().map(f)),
            SearchResult::NoResult => SearchResult::NoResult,
            SearchResult::NotUsed => SearchResult::NotUsed,
        }
    }

    /// AND of two results.
    pub fn and(self, other: Self) -> Self
    where
        T: Clone,
    {
        match (self, other) {
            (SearchResult::NoResult, _) | (_, SearchResult::NoResult) => SearchResult::NoResult,
            (SearchResult::NotUsed, other) => other,
            (this, SearchResult::NotUsed) => this,
            (SearchResult::Results(left), SearchResult::Results(right)) => {
                SearchResult::from_results(left.intersection(&right).cloned())
            }
        }
    }

    /// OR of two results.
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (SearchResult::Results(mut left), SearchResult::Results(right)) => {
                left.extend(right);
                SearchResult::Results(left)
            }
            (SearchResult::Results(set), _) | (_, SearchResult::Results(set)) => {
                SearchResult::Results(set)
            }
            (SearchResult::NoResult, _) | (_, SearchResult::NoResult) => SearchResult::NoResult,
            (SearchResult::NotUsed, SearchResult::NotUsed) => SearchResult::NotUsed,
        }
    }
}

/// AND-combines every result. `NoResult` is absorbing and `NotUsed` is the
/// identity, so an empty input yields `NotUsed`.
pub fn combine_results_with_and<T, I>(results: I) -> SearchResult<T>
where
    T: Ord + Clone,
    I: IntoIterator<Item = SearchResult<T>>,
{
    results
        .into_iter()
        .fold(SearchResult::NotUsed, SearchResult::and)
}

/// OR-combines every result: the union of all `Results`; `NoResult` if at
/// least one filter ran without matches; otherwise `NotUsed`.
pub fn take_all_results<T, I>(results: I) -> SearchResult<T>
where
    T: Ord,
    I: IntoIterator<Item = SearchResult<T>>,
{
    results
        .into_iter()
        .fold(SearchResult::NotUsed, SearchResult::or)
}

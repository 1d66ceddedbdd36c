//! Search phrase and search result tests
//!
//! Run with: cargo test --test search_tests

use contextmap::read_model::{KeyIndex, NameIndex};
use contextmap::search::{
    Lookup, Operator, SearchPhrase, SearchResult, SearchTerm, combine_results_with_and,
    take_all_results,
};

fn parsed(raw: &str) -> Option<(Operator, String)> {
    SearchPhrase::from_input(raw).map(|phrase| (phrase.operator(), phrase.text().to_string()))
}

#[test]
fn test_phrase_parsing_table() {
    assert_eq!(parsed("foo"), Some((Operator::Equals, "foo".to_string())));
    assert_eq!(parsed("foo*"), Some((Operator::StartsWith, "foo".to_string())));
    assert_eq!(parsed("*foo"), Some((Operator::EndsWith, "foo".to_string())));
    assert_eq!(parsed("*foo*"), Some((Operator::Contains, "foo".to_string())));
    assert_eq!(parsed(""), None);
    assert_eq!(parsed("   "), None);
}

#[test]
fn test_phrase_matching_is_case_insensitive() {
    let phrase = SearchPhrase::from_input("  *Order* ").unwrap();
    assert!(phrase.matches("PURCHASE ORDERS"));
    assert!(phrase.matches("order"));
    assert!(!phrase.matches("ordr"));

    let term = SearchTerm::from_input("Billing").unwrap();
    assert!(SearchPhrase::from_input("bill*").unwrap().matches_term(&term));
    assert!(SearchTerm::from_input(" ").is_none());
}

#[test]
fn test_and_combination_literals() {
    assert_eq!(
        combine_results_with_and(vec![SearchResult::<u32>::NotUsed, SearchResult::NotUsed]),
        SearchResult::NotUsed
    );
    assert_eq!(
        combine_results_with_and(vec![
            SearchResult::from_results([1u32, 2]),
            SearchResult::NotUsed
        ]),
        SearchResult::from_results([1, 2])
    );
    assert_eq!(
        combine_results_with_and(vec![
            SearchResult::from_results([1u32]),
            SearchResult::NoResult
        ]),
        SearchResult::NoResult
    );
}

#[test]
fn test_and_intersects_and_no_result_absorbs() {
    assert_eq!(
        combine_results_with_and(vec![
            SearchResult::from_results([1u32, 2, 3]),
            SearchResult::from_results([2, 3, 4]),
            SearchResult::NotUsed,
        ]),
        SearchResult::from_results([2, 3])
    );
    assert_eq!(
        combine_results_with_and(vec![
            SearchResult::from_results([1u32]),
            SearchResult::from_results([2]),
        ]),
        SearchResult::NoResult
    );
    assert_eq!(
        combine_results_with_and(vec![
            SearchResult::NoResult,
            SearchResult::from_results([1u32]),
        ]),
        SearchResult::NoResult
    );
}

#[test]
fn test_or_unions_results() {
    assert_eq!(
        take_all_results(vec![
            SearchResult::from_results([1u32]),
            SearchResult::NoResult,
            SearchResult::from_results([3]),
            SearchResult::NotUsed,
        ]),
        SearchResult::from_results([1, 3])
    );
    assert_eq!(
        take_all_results(vec![SearchResult::<u32>::NotUsed, SearchResult::NoResult]),
        SearchResult::NoResult
    );
    assert_eq!(
        take_all_results(Vec::<SearchResult<u32>>::new()),
        SearchResult::NotUsed
    );
}

#[test]
fn test_synonyms_or_fields_and() {
    let names = NameIndex::new()
        .with(1u32, "Ordering")
        .with(2, "Order Fulfilment")
        .with(3, "Billing")
        .with(4, "Invoicing");
    let keys = KeyIndex::new()
        .assign(1u32, Some("ORD"))
        .assign(3, Some("BIL"))
        .assign(4, Some("INV"));

    let synonyms = SearchPhrase::from_inputs(["order*", "invoic*", ""]);
    assert_eq!(synonyms.len(), 2);
    let by_name = names.by_any(&synonyms);
    assert_eq!(by_name, SearchResult::from_results([1, 2, 4]));

    let by_key = keys.by_optional(SearchPhrase::from_input("*v").as_ref());
    assert_eq!(
        combine_results_with_and([by_name.clone(), by_key]),
        SearchResult::from_results([4])
    );
    assert_eq!(
        combine_results_with_and([by_name, keys.by_optional(None)]),
        SearchResult::from_results([1, 2, 4])
    );
}

#[test]
fn test_empty_synonym_list_is_not_used() {
    let names = NameIndex::new().with(1u32, "Ordering");
    assert_eq!(names.by_any(&[]), SearchResult::NotUsed);
}

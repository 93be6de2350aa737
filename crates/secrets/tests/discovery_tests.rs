//! Tests for prefix and tag discovery against the in-memory store

#![allow(clippy::unwrap_used, clippy::expect_used)]

use secretsfetcher_secrets::{
    DiscoveryFetcher, FilterSpec, InMemorySecretStore, SecretError, SecretReference,
    SecretStoreClient, SecretsFetcher, SecretsProvider, StoreErrorKind, StoredSecret,
};
use std::sync::Arc;

fn fixture_store() -> InMemorySecretStore {
    InMemorySecretStore::new()
        .with_secret(StoredSecret::text("secret1", "arn1", "value1"))
        .with_secret(StoredSecret::text("myprefix", "arn2", "value2"))
        .with_secret(StoredSecret::text("myprefixABC", "arn3", "value3"))
        .with_secret(StoredSecret::text("myprefix/with_slash/a/b", "arn4", "value4"))
        .with_secret(
            StoredSecret::text("matching_prefix/xxx", "arn5", "value5")
                .with_tag("sometagnameXXX", "sometagValueYYY"),
        )
}

fn provider_for(store: InMemorySecretStore) -> (SecretsProvider, Arc<InMemorySecretStore>) {
    let store = Arc::new(store);
    let client: Arc<dyn SecretStoreClient> = store.clone();
    (SecretsProvider::new(client, Some("eu-west-1".to_string())), store)
}

fn arns(references: &[SecretReference]) -> Vec<&str> {
    let mut arns: Vec<_> = references.iter().map(|r| r.object_name.as_str()).collect();
    arns.sort_unstable();
    arns
}

#[tokio::test]
async fn test_prefix_matches_every_name_starting_with_it() {
    let (provider, _) = provider_for(fixture_store());

    let references = provider
        .list_secrets(&FilterSpec::new("myprefix"))
        .await
        .unwrap();

    assert_eq!(arns(&references), vec!["arn2", "arn3", "arn4"]);
    assert!(
        references
            .iter()
            .all(|r| r.object_version.is_none() && r.object_version_label.is_none())
    );
}

#[tokio::test]
async fn test_prefix_with_slash() {
    let (provider, _) = provider_for(fixture_store());

    let references = provider
        .list_secrets(&FilterSpec::new("myprefix/with_slash/"))
        .await
        .unwrap();
    assert_eq!(arns(&references), vec!["arn4"]);
}

#[tokio::test]
async fn test_exact_name_prefix() {
    let (provider, _) = provider_for(fixture_store());

    let references = provider
        .list_secrets(&FilterSpec::new("secret1"))
        .await
        .unwrap();
    assert_eq!(arns(&references), vec!["arn1"]);
}

#[tokio::test]
async fn test_tag_filters() {
    let (provider, _) = provider_for(fixture_store());

    let by_key = provider
        .list_secrets(&FilterSpec::new("matching_prefix").with_tag_key_prefixes(["sometagname"]))
        .await
        .unwrap();
    assert_eq!(arns(&by_key), vec!["arn5"]);

    let by_value = provider
        .list_secrets(
            &FilterSpec::new("matching_prefix").with_tag_value_prefixes(["sometagValue"]),
        )
        .await
        .unwrap();
    assert_eq!(arns(&by_value), vec!["arn5"]);

    let no_match = provider
        .list_secrets(&FilterSpec::new("matching_prefix").with_tag_key_prefixes(["other"]))
        .await
        .unwrap();
    assert!(no_match.is_empty());

    let by_key_and_value = provider
        .list_secrets(
            &FilterSpec::new("matching_prefix")
                .with_tag_key_prefixes(["sometagname"])
                .with_tag_value_prefixes(["sometagValue"]),
        )
        .await
        .unwrap();
    assert_eq!(arns(&by_key_and_value), vec!["arn5"]);

    let wrong_value = provider
        .list_secrets(
            &FilterSpec::new("matching_prefix")
                .with_tag_key_prefixes(["sometagname"])
                .with_tag_value_prefixes(["nonexistent"]),
        )
        .await
        .unwrap();
    assert!(wrong_value.is_empty());

    // Tagged secret does not match a different name prefix
    let wrong_name = provider
        .list_secrets(&FilterSpec::new("myprefix").with_tag_key_prefixes(["sometagname"]))
        .await
        .unwrap();
    assert!(wrong_name.is_empty());
}

#[tokio::test]
async fn test_tag_key_and_value_match_independently() {
    let store = InMemorySecretStore::new().with_secret(
        StoredSecret::text("svc/a", "arn:a", "v")
            .with_tag("team", "payments")
            .with_tag("env", "prod"),
    );
    let (provider, _) = provider_for(store);

    // Key and value come from different tags
    let references = provider
        .list_secrets(
            &FilterSpec::new("svc/")
                .with_tag_key_prefixes(["team"])
                .with_tag_value_prefixes(["prod"]),
        )
        .await
        .unwrap();
    assert_eq!(arns(&references), vec!["arn:a"]);
}

#[tokio::test]
async fn test_blank_prefix_makes_no_remote_call() {
    for prefix in ["", "   ", "\t\n"] {
        let (provider, store) = provider_for(fixture_store());

        let err = provider
            .list_secrets(&FilterSpec::new(prefix).with_tag_key_prefixes(["sometagname"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SecretError::Validation { .. }));

        let fetcher = SecretsFetcher::Discovery(DiscoveryFetcher::new(
            &provider,
            FilterSpec::new(prefix),
        ));
        assert!(matches!(
            fetcher.fetch().await,
            Err(SecretError::Validation { .. })
        ));

        assert_eq!(store.list_calls(), 0);
        assert_eq!(store.get_calls(), 0);
    }
}

#[tokio::test]
async fn test_pagination_collects_every_page() {
    let mut store = InMemorySecretStore::new().with_page_size(2);
    for i in 0..7 {
        store = store.with_secret(StoredSecret::text(
            format!("paged/{i}"),
            format!("arn:paged:{i}"),
            "v",
        ));
    }
    let (provider, store) = provider_for(store);

    let references = provider
        .list_secrets(&FilterSpec::new("paged/"))
        .await
        .unwrap();

    assert_eq!(references.len(), 7);
    assert_eq!(store.list_calls(), 4);
}

#[tokio::test]
async fn test_page_failure_discards_accumulated_results() {
    let mut store = InMemorySecretStore::new()
        .with_page_size(2)
        .with_list_failure_on_page(2);
    for i in 0..5 {
        store = store.with_secret(StoredSecret::text(
            format!("paged/{i}"),
            format!("arn:paged:{i}"),
            "v",
        ));
    }
    let (provider, store) = provider_for(store);

    let err = provider
        .list_secrets(&FilterSpec::new("paged/"))
        .await
        .unwrap_err();

    match err {
        SecretError::Listing {
            prefix,
            page,
            source,
        } => {
            assert_eq!(prefix, "paged/");
            assert_eq!(page, 2);
            assert_eq!(source.kind(), StoreErrorKind::Transient);
        }
        other => panic!("expected listing error, got {other:?}"),
    }
    assert_eq!(store.list_calls(), 2);
    assert_eq!(store.get_calls(), 0);
}

#[tokio::test]
async fn test_discovery_fetches_listed_secrets() {
    let (provider, store) = provider_for(fixture_store());

    let outcome = SecretsFetcher::Discovery(DiscoveryFetcher::new(
        &provider,
        FilterSpec::new("myprefix/"),
    ))
    .fetch()
    .await
    .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.secrets.len(), 1);
    assert_eq!(outcome.secrets[0].name(), "myprefix/with_slash/a/b");
    assert_eq!(outcome.secrets[0].expose_content(), b"value4");
    assert_eq!(store.get_calls(), 1);
}

#[tokio::test]
async fn test_discovery_skips_secrets_that_fail_to_fetch() {
    let store = fixture_store().with_get_failure("arn3", StoreErrorKind::AccessDenied);
    let (provider, _) = provider_for(store);

    let outcome = DiscoveryFetcher::new(&provider, FilterSpec::new("myprefix"))
        .fetch()
        .await
        .unwrap();

    assert_eq!(outcome.secrets.len(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].reference.object_name, "arn3");
    assert!(matches!(
        outcome.failures[0].error,
        SecretError::AccessDenied { .. }
    ));
}

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_listing_returns_exactly_the_prefixed_names(
            names in proptest::collection::btree_set("[ab/]{1,6}", 0..12),
            prefix in "[ab/]{1,3}",
        ) {
            let mut store = InMemorySecretStore::new().with_page_size(3);
            for name in &names {
                store = store.with_secret(StoredSecret::text(
                    name.clone(),
                    format!("arn:{name}"),
                    "v",
                ));
            }
            let (provider, _) = provider_for(store);

            let references = tokio_test::block_on(provider.list_secrets(&FilterSpec::new(&prefix)))
                .unwrap();

            let mut listed: Vec<_> = references.into_iter().map(|r| r.object_name).collect();
            listed.sort();
            let expected: Vec<_> = names
                .iter()
                .filter(|name| name.starts_with(&prefix))
                .map(|name| format!("arn:{name}"))
                .collect();
            prop_assert_eq!(listed, expected);
        }
    }
}

//! Pipeline scenarios against stub oracle and place search.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use super::support::{orchestrator, place, StubLoader, StubOracle, StubPlaces, DIMENSIONS};
use crate::config::Config;
use crate::search::SearchError;

const NYC_NOTES: &str = "trip: nyc jun 25-27\ndinner with friends, cheap eats";

#[tokio::test]
async fn test_contextual_search_falls_back_to_literal_query() {
    let loader = StubLoader::new(StubOracle::default());
    let places = Arc::new(StubPlaces::default().respond(
        "quiet place to work",
        vec![place("a", "quiet work place"), place("b", "xylophone zebra")],
    ));
    let orch = orchestrator(loader.clone(), places.clone(), &Config::default());

    let outcome = orch
        .search_with_context("quiet place to work", NYC_NOTES)
        .await
        .unwrap();

    let contextual = &outcome.contextual_query;
    assert!(contextual.contains("quiet peaceful serene calm tranquil"));
    assert!(contextual.contains("work laptop wifi quiet productive"));
    assert!(contextual.contains("New York, NY"));
    assert!(contextual.ends_with("dinner friends cheap"));

    let calls = places.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(&calls[0].query, contextual);
    assert_eq!(calls[1].query, "quiet place to work");
    assert_eq!(calls[1].location.as_deref(), Some("New York, NY"));
    assert_eq!(calls[1].notes.as_deref(), Some(NYC_NOTES));

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.best().unwrap().place_id, "a");
    assert!(outcome.best().unwrap().similarity_score.is_some());
    assert!(!outcome.from_cache);
    assert!(!outcome.superseded);

    let sessions = orch.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].query, "quiet place to work");
    // contextual attempt, literal fallback, literal re-rank
    assert_eq!(sessions[0].embeddings.len(), 3);
    assert!(sessions[0].embeddings.iter().all(|e| e.dimension() == DIMENSIONS));
    assert!(sessions[0].clusters.contains(&"quiet".to_string()));
    assert!(sessions[0].clusters.contains(&"work".to_string()));
}

#[tokio::test]
async fn test_no_fallback_when_contextual_query_finds_candidates() {
    let loader = StubLoader::new(StubOracle::default());
    let places = Arc::new(StubPlaces::with_default(vec![place("a", "cozy cafe")]));
    let orch = orchestrator(loader, places.clone(), &Config::default());

    let outcome = orch.search_locations("cozy spot").await.unwrap();

    assert_eq!(places.calls().len(), 1);
    assert_eq!(
        outcome.contextual_query,
        "cozy warm intimate comfortable relaxing spot coffee cafe"
    );
    assert_eq!(outcome.results.len(), 1);
}

#[tokio::test]
async fn test_cache_hit_skips_all_work() {
    let loader = StubLoader::new(StubOracle::default());
    let places = Arc::new(StubPlaces::with_default(vec![place("a", "cozy coffee")]));
    let orch = orchestrator(loader.clone(), places.clone(), &Config::default());

    let first = orch.search_locations("Cozy spot").await.unwrap();
    let oracle_calls = loader.oracle.calls.load(Ordering::SeqCst);

    let second = orch.search_locations("  cozy spot ").await.unwrap();

    assert!(second.from_cache);
    assert_eq!(second.results, first.results);
    assert_eq!(places.calls().len(), 1);
    assert_eq!(loader.oracle.calls.load(Ordering::SeqCst), oracle_calls);
    assert_eq!(loader.load_count(), 1);
    assert_eq!(orch.sessions().len(), 1);
    assert_eq!(second.sequence, first.sequence + 1);
}

#[tokio::test]
async fn test_earliest_key_evicted_after_51_searches() {
    let loader = StubLoader::new(StubOracle::default());
    let places = Arc::new(StubPlaces::with_default(vec![place("a", "park")]));
    let orch = orchestrator(loader, places.clone(), &Config::default());

    for i in 0..51 {
        orch.search_locations(&format!("spot {i}")).await.unwrap();
    }
    assert_eq!(orch.cache_len(), 50);

    let recent = orch.search_locations("spot 50").await.unwrap();
    assert!(recent.from_cache);

    let calls_before = places.calls().len();
    let evicted = orch.search_locations("spot 0").await.unwrap();
    assert!(!evicted.from_cache);
    assert_eq!(places.calls().len(), calls_before + 1);
}

#[tokio::test(start_paused = true)]
async fn test_context_entries_expire_but_plain_entries_do_not() {
    let loader = StubLoader::new(StubOracle::default());
    let places = Arc::new(StubPlaces::with_default(vec![place("a", "cozy cafe")]));
    let orch = orchestrator(loader, places.clone(), &Config::default());

    orch.search_with_context("cozy spot", "trip: sf").await.unwrap();
    orch.search_locations("lively bar").await.unwrap();

    tokio::time::advance(Duration::from_secs(299)).await;
    assert!(orch.search_with_context("cozy spot", "trip: sf").await.unwrap().from_cache);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(!orch.search_with_context("cozy spot", "trip: sf").await.unwrap().from_cache);

    tokio::time::advance(Duration::from_secs(3600)).await;
    assert!(orch.search_locations("lively bar").await.unwrap().from_cache);
}

#[tokio::test]
async fn test_context_key_depends_on_notes() {
    let loader = StubLoader::new(StubOracle::default());
    let places = Arc::new(StubPlaces::with_default(vec![place("a", "cozy cafe")]));
    let orch = orchestrator(loader, places.clone(), &Config::default());

    orch.search_with_context("cozy spot", "trip: sf").await.unwrap();
    let other_trip = orch.search_with_context("cozy spot", "trip: nyc").await.unwrap();
    assert!(!other_trip.from_cache);

    let sf = &places.calls()[0];
    assert_eq!(sf.location.as_deref(), Some("San Francisco, CA"));
}

#[tokio::test]
async fn test_blank_query_does_no_io() {
    let loader = StubLoader::new(StubOracle::default());
    let places = Arc::new(StubPlaces::with_default(vec![place("a", "cafe")]));
    let orch = orchestrator(loader.clone(), places.clone(), &Config::default());

    let outcome = orch.search_with_context("   ", NYC_NOTES).await.unwrap();
    assert!(outcome.results.is_empty());
    assert!(outcome.best().is_none());
    assert_eq!(orch.find_best_match("", None).await.unwrap(), None);

    assert_eq!(loader.load_count(), 0);
    assert!(places.calls().is_empty());
    assert_eq!(orch.cache_len(), 0);
}

#[tokio::test]
async fn test_fetch_failure_is_an_empty_result() {
    let loader = StubLoader::new(StubOracle::default());
    let places = Arc::new(StubPlaces {
        fail_status: Some(502),
        ..Default::default()
    });
    let orch = orchestrator(loader, places.clone(), &Config::default());

    let outcome = orch.search_locations("cozy spot").await.unwrap();

    assert!(outcome.results.is_empty());
    // contextual attempt, then the literal fallback
    assert_eq!(places.calls().len(), 2);
    assert_eq!(orch.cache_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_place_search_timeout_is_an_empty_result() {
    let loader = StubLoader::new(StubOracle::default());
    let places = Arc::new(StubPlaces {
        default_response: vec![place("a", "cafe")],
        delay: Some((String::new(), Duration::from_secs(60))),
        ..Default::default()
    });
    let orch = orchestrator(loader, places.clone(), &Config::default());

    let outcome = orch.search_locations("cozy spot").await.unwrap();

    assert!(outcome.results.is_empty());
    assert_eq!(places.calls().len(), 2);
}

#[tokio::test]
async fn test_model_load_failure_escapes_and_can_be_retried() {
    let loader = StubLoader::failing(1);
    let places = Arc::new(StubPlaces::with_default(vec![place("a", "cozy cafe")]));
    let orch = orchestrator(loader.clone(), places.clone(), &Config::default());

    let err = orch.search_locations("cozy spot").await.unwrap_err();
    assert!(matches!(err, SearchError::ModelLoad(_)));
    assert!(places.calls().is_empty());

    let outcome = orch.search_locations("cozy spot").await.unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(loader.load_count(), 2);
}

#[tokio::test]
async fn test_initialize_model_is_idempotent() {
    let loader = StubLoader::failing(1);
    let orch = orchestrator(loader.clone(), Arc::new(StubPlaces::default()), &Config::default());

    assert!(matches!(
        orch.initialize_model().await,
        Err(SearchError::ModelLoad(_))
    ));
    orch.initialize_model().await.unwrap();
    orch.initialize_model().await.unwrap();
    assert_eq!(loader.load_count(), 2);
}

#[tokio::test]
async fn test_rerank_failure_keeps_retrieval_ranking() {
    let loader = StubLoader::new(StubOracle::failing_on(&["lively bar"]));
    let places = Arc::new(StubPlaces::with_default(vec![
        place("b", "quiet park"),
        place("a", "Lively Bar & Grill"),
    ]));
    let orch = orchestrator(loader, places, &Config::default());

    let outcome = orch.search_locations("lively bar").await.unwrap();

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.best().unwrap().place_id, "a");
    // only the contextual query embedding made it into the session
    assert_eq!(orch.sessions()[0].embeddings.len(), 1);
}

#[tokio::test]
async fn test_candidates_capped_and_results_truncated() {
    let loader = StubLoader::new(StubOracle::default());
    let candidates = (0..15).map(|i| place(&i.to_string(), &format!("cafe {i}"))).collect();
    let places = Arc::new(StubPlaces::with_default(candidates));
    let orch = orchestrator(loader.clone(), places, &Config::default());

    let outcome = orch.search_locations("cafe").await.unwrap();

    assert_eq!(outcome.results.len(), 5);
    // (query + 10 candidates) for retrieval and again for the re-rank
    assert_eq!(loader.oracle.calls.load(Ordering::SeqCst), 22);
}

#[tokio::test]
async fn test_user_location_used_when_notes_have_no_city() {
    let mut config = Config::default();
    config.places.user_location = Some("Austin, TX".to_string());

    let loader = StubLoader::new(StubOracle::default());
    let places = Arc::new(StubPlaces::with_default(vec![place("a", "cafe")]));
    let orch = orchestrator(loader, places.clone(), &config);

    orch.search_with_context("cozy spot", "nothing about cities").await.unwrap();
    orch.search_with_context("cozy spot", "trip: sf").await.unwrap();

    let calls = places.calls();
    assert_eq!(calls[0].location.as_deref(), Some("Austin, TX"));
    assert_eq!(calls[1].location.as_deref(), Some("San Francisco, CA"));
}

#[tokio::test(start_paused = true)]
async fn test_older_search_is_superseded_by_newer_one() {
    let loader = StubLoader::new(StubOracle::default());
    let places = Arc::new(StubPlaces {
        default_response: vec![place("a", "cozy cafe")],
        delay: Some(("slow".to_string(), Duration::from_millis(50))),
        ..Default::default()
    });
    let orch = orchestrator(loader, places, &Config::default());

    let (slow, fast) = tokio::join!(
        orch.search_locations("slow cozy spot"),
        orch.search_locations("lively bar"),
    );
    let (slow, fast) = (slow.unwrap(), fast.unwrap());

    assert!(slow.superseded);
    assert!(!fast.superseded);
    assert!(slow.sequence < fast.sequence);

    // superseded results are still cached
    assert!(orch.search_locations("slow cozy spot").await.unwrap().from_cache);

    let (slow, fast) = tokio::join!(
        orch.find_best_match("slow again", None),
        orch.find_best_match("lively again", None),
    );
    assert_eq!(slow.unwrap(), None);
    assert!(fast.unwrap().is_some());
}

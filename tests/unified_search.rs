//! End-to-end tests for the unified orchestrator over mock sources.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Duration;
use unified_legal_search::aggregator::{SourceAggregator, COMMERCIAL_AGGREGATE, PUBLIC_AGGREGATE};
use unified_legal_search::{
    Config, DocumentType, LegalDocument, LegalSource, SearchError, SearchQuery, SearchResult,
    SourceName, UnifiedSearchService,
};

struct MockSource {
    name: SourceName,
    docs: Vec<LegalDocument>,
    delay: Duration,
    configured: bool,
    calls: Arc<AtomicUsize>,
}

impl MockSource {
    fn new(name: SourceName, docs: Vec<LegalDocument>) -> Self {
        Self {
            name,
            docs,
            delay: Duration::from_millis(0),
            configured: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl LegalSource for MockSource {
    fn name(&self) -> SourceName {
        self.name
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn search(&self, _query: &SearchQuery) -> SearchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        SearchResult::new(
            self.docs.clone(),
            self.delay.as_millis() as u64,
            self.name.as_str(),
        )
    }

    async fn get_document(&self, id: &str) -> Option<LegalDocument> {
        self.docs.iter().find(|d| d.id == id).cloned()
    }
}

fn doc(id: &str, title: &str, reference: &str, relevance: u8, source: SourceName) -> LegalDocument {
    LegalDocument {
        id: id.to_string(),
        title: title.to_string(),
        court: "Tribunal Supremo".to_string(),
        date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
        reference: reference.to_string(),
        summary: String::new(),
        full_text: None,
        relevance,
        tags: Vec::new(),
        jurisdiction: "ES".to_string(),
        document_type: DocumentType::Judgment,
        source,
        url: None,
    }
}

fn service(
    config: Config,
    public: Vec<Arc<dyn LegalSource>>,
    commercial: Vec<Arc<dyn LegalSource>>,
) -> UnifiedSearchService {
    UnifiedSearchService::with_aggregators(
        config,
        SourceAggregator::new(PUBLIC_AGGREGATE, public),
        SourceAggregator::new(COMMERCIAL_AGGREGATE, commercial),
    )
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[tokio::test]
async fn end_to_end_two_adapters() {
    init_tracing();
    let public = vec![
        Arc::new(MockSource::new(
            SourceName::Cendoj,
            vec![doc("c1", "Sentencia A", "STS 1/2023", 95, SourceName::Cendoj)],
        )) as Arc<dyn LegalSource>,
        Arc::new(MockSource::new(
            SourceName::Boe,
            vec![doc("b1", "Disposición B", "BOE-A-1", 88, SourceName::Boe)],
        )) as Arc<dyn LegalSource>,
    ];
    let svc = service(Config::default(), public, vec![]);

    let response = svc
        .search_all(&SearchQuery::text("despido improcedente"))
        .await
        .unwrap();

    assert!(!response.from_cache);
    assert_eq!(response.combined.total_results, 2);
    assert_eq!(response.combined.documents[0].relevance, 95);
    assert_eq!(response.combined.source, "Unified");
    assert_eq!(response.public.len(), 2);
    assert!(response.commercial.is_empty());
}

#[tokio::test]
async fn second_call_is_served_from_cache() {
    let public = vec![Arc::new(MockSource::new(
        SourceName::Cendoj,
        vec![doc("c1", "Sentencia A", "STS 1/2023", 95, SourceName::Cendoj)],
    )) as Arc<dyn LegalSource>];
    let svc = service(Config::default(), public, vec![]);
    let query = SearchQuery::text("plusvalía municipal");

    let first = svc.search_all(&query).await.unwrap();
    let second = svc.search_all(&query).await.unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.combined, second.combined);
    // Breakdown detail is only available on a fresh fetch.
    assert!(second.public.is_empty());
    assert!(second.commercial.is_empty());
}

#[tokio::test(start_paused = true)]
async fn cache_expires_after_configured_duration() {
    let mut config = Config::default();
    config.cache.duration_ms = 10;

    let source = MockSource::new(
        SourceName::Cendoj,
        vec![doc("c1", "Sentencia A", "STS 1/2023", 95, SourceName::Cendoj)],
    );
    let calls = source.call_counter();
    let svc = service(config, vec![Arc::new(source) as Arc<dyn LegalSource>], vec![]);
    let query = SearchQuery::text("convenio colectivo");

    svc.search_all(&query).await.unwrap();
    tokio::time::advance(Duration::from_millis(20)).await;
    let second = svc.search_all(&query).await.unwrap();

    assert!(!second.from_cache);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn duplicate_title_reference_pairs_collapse_to_one() {
    let shared_title = "Sentencia sobre despido";
    let shared_reference = "STS 2341/2023";
    let public = vec![Arc::new(MockSource::new(
        SourceName::Cendoj,
        vec![doc("c1", shared_title, shared_reference, 90, SourceName::Cendoj)],
    )) as Arc<dyn LegalSource>];
    let commercial = vec![Arc::new(MockSource::new(
        SourceName::Aranzadi,
        vec![
            doc("a1", shared_title, shared_reference, 80, SourceName::Aranzadi),
            doc("a2", "Comentario distinto", "RJ 2023\\1", 60, SourceName::Aranzadi),
        ],
    )) as Arc<dyn LegalSource>];
    let svc = service(Config::default(), public, commercial);

    let response = svc.search_all(&SearchQuery::text("despido")).await.unwrap();

    assert_eq!(response.combined.total_results, 2);
    let winner = response
        .combined
        .documents
        .iter()
        .find(|d| d.title == shared_title)
        .unwrap();
    // Public sources are merged first, so the public copy wins.
    assert_eq!(winner.source, SourceName::Cendoj);
    assert_eq!(winner.id, "c1");
}

#[tokio::test]
async fn ranking_is_non_increasing() {
    let public = vec![Arc::new(MockSource::new(
        SourceName::Cendoj,
        vec![
            doc("c1", "A", "R1", 40, SourceName::Cendoj),
            doc("c2", "B", "R2", 95, SourceName::Cendoj),
            doc("c3", "C", "R3", 70, SourceName::Cendoj),
        ],
    )) as Arc<dyn LegalSource>];
    let svc = service(Config::default(), public, vec![]);

    let response = svc.search_all(&SearchQuery::text("q")).await.unwrap();
    let relevances: Vec<u8> = response
        .combined
        .documents
        .iter()
        .map(|d| d.relevance)
        .collect();
    assert_eq!(relevances, vec![95, 70, 40]);
}

#[tokio::test]
async fn combined_result_is_capped_at_twice_per_source_limit() {
    let mut config = Config::default();
    config.search.max_results_per_source = 2;

    let docs: Vec<LegalDocument> = (0..10)
        .map(|i| {
            doc(
                &format!("c{}", i),
                &format!("Documento {}", i),
                &format!("REF {}", i),
                90 - i as u8,
                SourceName::Cendoj,
            )
        })
        .collect();
    let public = vec![Arc::new(MockSource::new(SourceName::Cendoj, docs)) as Arc<dyn LegalSource>];
    let svc = service(config, public, vec![]);

    let response = svc.search_all(&SearchQuery::text("q")).await.unwrap();
    assert_eq!(response.combined.total_results, 4);
}

#[tokio::test(start_paused = true)]
async fn slow_public_branch_is_dropped_not_fatal() {
    let mut config = Config::default();
    config.search.timeout_ms = 20;

    let public = vec![Arc::new(
        MockSource::new(
            SourceName::Cendoj,
            vec![doc("c1", "Lenta", "R1", 99, SourceName::Cendoj)],
        )
        .with_delay(Duration::from_millis(100)),
    ) as Arc<dyn LegalSource>];
    let commercial = vec![Arc::new(MockSource::new(
        SourceName::Vlex,
        vec![doc("v1", "Rápida", "R2", 70, SourceName::Vlex)],
    )) as Arc<dyn LegalSource>];
    let svc = service(config, public, commercial);

    let response = svc.search_all(&SearchQuery::text("q")).await.unwrap();

    assert!(response.public.is_empty());
    assert_eq!(response.combined.total_results, 1);
    assert!(response
        .combined
        .documents
        .iter()
        .all(|d| d.source == SourceName::Vlex));
}

#[tokio::test]
async fn combined_path_proceeds_silently_when_rate_limited() {
    let mut config = Config::default();
    config.rate_limit.max_requests = 1;
    config.cache.enabled = false;

    let public = vec![Arc::new(MockSource::new(
        SourceName::Cendoj,
        vec![doc("c1", "A", "R1", 50, SourceName::Cendoj)],
    )) as Arc<dyn LegalSource>];
    let svc = service(config, public, vec![]);

    let first = svc.search_all(&SearchQuery::text("uno")).await.unwrap();
    assert_eq!(first.combined.total_results, 1);

    // Quota exhausted: the public branch is skipped, not an error.
    let second = svc.search_all(&SearchQuery::text("dos")).await.unwrap();
    assert!(!second.from_cache);
    assert_eq!(second.combined.total_results, 0);
}

#[tokio::test]
async fn narrow_path_errors_when_rate_limited() {
    let mut config = Config::default();
    config.rate_limit.max_requests = 1;
    config.cache.enabled = false;

    let public = vec![Arc::new(MockSource::new(
        SourceName::Cendoj,
        vec![doc("c1", "A", "R1", 50, SourceName::Cendoj)],
    )) as Arc<dyn LegalSource>];
    let svc = service(config, public, vec![]);

    svc.search_public_only(&SearchQuery::text("uno")).await.unwrap();
    let denied = svc.search_public_only(&SearchQuery::text("dos")).await;

    assert!(matches!(
        denied,
        Err(SearchError::RateLimitExceeded { .. })
    ));
}

#[tokio::test]
async fn narrow_paths_use_separate_cache_namespaces() {
    let public = vec![Arc::new(MockSource::new(
        SourceName::Cendoj,
        vec![doc("c1", "A", "R1", 50, SourceName::Cendoj)],
    )) as Arc<dyn LegalSource>];
    let commercial = vec![Arc::new(MockSource::new(
        SourceName::Vlex,
        vec![doc("v1", "B", "R2", 60, SourceName::Vlex)],
    )) as Arc<dyn LegalSource>];
    let svc = service(Config::default(), public, commercial);
    let query = SearchQuery::text("misma consulta");

    let public_only = svc.search_public_only(&query).await.unwrap();
    let commercial_only = svc.search_commercial_only(&query).await.unwrap();

    assert_eq!(public_only.source, PUBLIC_AGGREGATE);
    assert_eq!(commercial_only.source, COMMERCIAL_AGGREGATE);
    assert_ne!(public_only.documents, commercial_only.documents);
}

#[tokio::test]
async fn unconfigured_commercial_group_is_not_dispatched() {
    let public = vec![Arc::new(MockSource::new(
        SourceName::Cendoj,
        vec![doc("c1", "A", "R1", 50, SourceName::Cendoj)],
    )) as Arc<dyn LegalSource>];
    let commercial_source = MockSource {
        name: SourceName::Aranzadi,
        docs: vec![doc("a1", "B", "R2", 70, SourceName::Aranzadi)],
        delay: Duration::from_millis(0),
        configured: false,
        calls: Arc::new(AtomicUsize::new(0)),
    };
    let commercial_calls = commercial_source.call_counter();
    let svc = service(
        Config::default(),
        public,
        vec![Arc::new(commercial_source) as Arc<dyn LegalSource>],
    );

    let response = svc.search_all(&SearchQuery::text("q")).await.unwrap();

    assert_eq!(commercial_calls.load(Ordering::SeqCst), 0);
    assert!(response.commercial.is_empty());
    assert_eq!(response.combined.total_results, 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_identical_queries_fetch_once() {
    let source = MockSource::new(
        SourceName::Cendoj,
        vec![doc("c1", "A", "R1", 50, SourceName::Cendoj)],
    )
    .with_delay(Duration::from_millis(30));
    let calls = source.call_counter();
    let svc = service(
        Config::default(),
        vec![Arc::new(source) as Arc<dyn LegalSource>],
        vec![],
    );
    let query = SearchQuery::text("misma consulta");

    let (a, b) = tokio::join!(svc.search_all(&query), svc.search_all(&query));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.combined, b.combined);
    assert!(a.from_cache || b.from_cache);
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let svc = service(Config::default(), vec![], vec![]);
    let err = svc.search_all(&SearchQuery::text("   ")).await;
    assert!(matches!(err, Err(SearchError::InvalidSearchQuery { .. })));
}

#[tokio::test]
async fn clear_cache_forces_a_fresh_fetch() {
    let source = MockSource::new(
        SourceName::Cendoj,
        vec![doc("c1", "A", "R1", 50, SourceName::Cendoj)],
    );
    let calls = source.call_counter();
    let svc = service(
        Config::default(),
        vec![Arc::new(source) as Arc<dyn LegalSource>],
        vec![],
    );
    let query = SearchQuery::text("q");

    svc.search_all(&query).await.unwrap();
    assert_eq!(svc.cache_stats().await.size, 1);
    svc.clear_cache().await;
    assert_eq!(svc.cache_stats().await.size, 0);

    let again = svc.search_all(&query).await.unwrap();
    assert!(!again.from_cache);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn get_document_prefers_public_copy() {
    let public = vec![Arc::new(MockSource::new(
        SourceName::Cendoj,
        vec![doc("shared", "Pública", "R1", 50, SourceName::Cendoj)],
    )) as Arc<dyn LegalSource>];
    let commercial = vec![Arc::new(MockSource::new(
        SourceName::Vlex,
        vec![doc("shared", "Comercial", "R2", 70, SourceName::Vlex)],
    )) as Arc<dyn LegalSource>];
    let svc = service(Config::default(), public, commercial);

    let hit = svc.get_document("shared").await.unwrap();
    assert_eq!(hit.title, "Pública");
    assert!(svc.get_document("missing").await.is_none());
}

#[tokio::test]
async fn source_status_reports_configuration() {
    let public = vec![Arc::new(MockSource::new(SourceName::Cendoj, vec![])) as Arc<dyn LegalSource>];
    let commercial_source = MockSource {
        name: SourceName::Aranzadi,
        docs: vec![],
        delay: Duration::from_millis(0),
        configured: false,
        calls: Arc::new(AtomicUsize::new(0)),
    };
    let svc = service(
        Config::default(),
        public,
        vec![Arc::new(commercial_source) as Arc<dyn LegalSource>],
    );

    let status = svc.source_status();
    assert_eq!(status.len(), 2);
    assert!(status.iter().any(|s| s.name == "CENDOJ" && s.configured));
    assert!(status
        .iter()
        .any(|s| s.name == "Aranzadi" && s.commercial && !s.configured));
}

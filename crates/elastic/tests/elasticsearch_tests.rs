//! Repository and service integration tests.
//!
//! Tests in `es_integration` use testcontainers to spin up a real
//! Elasticsearch instance in Docker.
//!
//! Run with: `cargo test -p helios-elastic --features integration-tests -- es_integration`

use helios_elastic::{
    Document, ElasticConfiguration, ElasticContext, ElasticsearchRepository, ElasticsearchService,
    RefreshPolicy,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Product {
    id: String,
    name: String,
    brand: String,
    price: f64,
}

impl Document for Product {
    fn id(&self) -> String {
        self.id.clone()
    }
}

fn product(id: &str, name: &str, brand: &str, price: f64) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        brand: brand.to_string(),
        price,
    }
}

// ============================================================================
// Wiring Tests (no ES instance required)
// ============================================================================

#[test]
fn test_context_hands_out_type_bound_handles() {
    let context = ElasticContext::new(ElasticConfiguration::default()).unwrap();

    let repo: ElasticsearchRepository<Product> = context.repository();
    assert_eq!(repo.index_name(), "product");

    let service: ElasticsearchService<Product> = context.service();
    assert_eq!(service.index_name(), "product");
    assert!(!service.has_secondary());
}

#[test]
fn test_configuration_from_json() {
    let config: ElasticConfiguration = serde_json::from_str(
        r#"{"url": "https://es.example.com:9243", "username": "elastic", "password": "secret"}"#,
    )
    .unwrap();

    assert!(config.api_versioning);
    assert!(config.has_credentials());
    assert!(config.validate().is_ok());

    let repo = ElasticContext::new(config)
        .unwrap()
        .repository::<Product>()
        .with_refresh(RefreshPolicy::WaitFor);
    assert_eq!(repo.refresh_policy(), RefreshPolicy::WaitFor);
}

// ============================================================================
// Live Cluster Tests
// ============================================================================

#[cfg(feature = "integration-tests")]
mod es_integration {
    use helios_elastic::mapping::{Mapping, Property};
    use helios_elastic::query::{Aggregation, Aggregations, Condition, GetRequest, Query};
    use helios_elastic::{
        ConnectionTarget, ElasticClient, ElasticConfiguration, ElasticError, ElasticRepository,
        ElasticsearchRepository, ElasticsearchService, FuzzyMode, RefreshPolicy, SearchService,
    };
    use serde_json::json;

    use testcontainers::ImageExt;
    use testcontainers::runners::AsyncRunner;
    use testcontainers_modules::elastic_search::ElasticSearch;
    use tokio::sync::OnceCell;

    use super::{Product, product};

    /// Shared Elasticsearch container reused across all tests in this module.
    struct SharedEs {
        host: String,
        port: u16,
        /// Kept alive for the duration of the test binary; dropped at process exit.
        _container: testcontainers::ContainerAsync<ElasticSearch>,
    }

    static SHARED_ES: OnceCell<SharedEs> = OnceCell::const_new();

    async fn shared_es() -> &'static SharedEs {
        SHARED_ES
            .get_or_init(|| async {
                let run_id = std::env::var("GITHUB_RUN_ID").unwrap_or_default();
                let container = ElasticSearch::default()
                    .with_env_var("ES_JAVA_OPTS", "-Xms256m -Xmx256m")
                    .with_label("github.run_id", &run_id)
                    .with_startup_timeout(std::time::Duration::from_secs(120))
                    .start()
                    .await
                    .expect("Failed to start Elasticsearch container");

                let port = container
                    .get_host_port_ipv4(9200)
                    .await
                    .expect("Failed to get host port");

                let host = container
                    .get_host()
                    .await
                    .expect("Failed to get host")
                    .to_string();

                SharedEs {
                    host,
                    port,
                    _container: container,
                }
            })
            .await
    }

    /// The container runs a 7.x image, which rejects the
    /// `compatible-with=8` media types sent when API versioning is on.
    async fn client() -> ElasticClient {
        let es = shared_es().await;
        let config = ElasticConfiguration::new(format!("http://{}:{}", es.host, es.port))
            .with_api_versioning(false);
        ElasticClient::new(&config).expect("Failed to create client")
    }

    fn unique_index(prefix: &str) -> String {
        format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
    }

    async fn repository(prefix: &str) -> ElasticsearchRepository<Product> {
        ElasticsearchRepository::with_index(client().await, unique_index(prefix))
            .with_refresh(RefreshPolicy::WaitFor)
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("1", "iPhone", "Apple", 999.0),
            product("2", "Galaxy Phone", "Samsung", 799.0),
            product("3", "Pixel Phone", "Google", 699.0),
            product("4", "MacBook", "Apple", 1999.0),
        ]
    }

    #[tokio::test]
    async fn es_integration_ping_and_health() {
        let client = client().await;
        assert!(client.ping().await.unwrap());

        let health = client.cluster_health().await.unwrap();
        assert!(health.get("status").is_some());
    }

    #[tokio::test]
    async fn es_integration_insert_then_get() {
        let repo = repository("insert-get").await;
        let phone = product("sku-1", "iPhone", "Apple", 999.0);

        repo.insert(&phone).await.unwrap();

        assert_eq!(repo.get("sku-1").await.unwrap(), phone);
        assert_eq!(repo.find("sku-1").await.unwrap(), Some(phone.clone()));
        assert!(repo.exists("sku-1").await.unwrap());

        let filtered = repo
            .find_with(&GetRequest::new("sku-1").realtime(true))
            .await
            .unwrap();
        assert_eq!(filtered, Some(phone));
    }

    #[tokio::test]
    async fn es_integration_missing_document() {
        let repo = repository("missing").await;
        repo.create_index().await.unwrap();

        let err = repo.get("nope").await.unwrap_err();
        assert!(err.is_not_found(), "expected not found, got {:?}", err);
        assert!(repo.find("nope").await.unwrap().is_none());
        assert!(!repo.exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn es_integration_delete_by_id() {
        let repo = repository("delete").await;
        repo.insert(&product("sku-1", "iPhone", "Apple", 999.0))
            .await
            .unwrap();

        repo.delete_by_id("sku-1").await.unwrap();
        assert!(!repo.exists("sku-1").await.unwrap());

        let err = repo.delete_by_id("sku-1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn es_integration_update() {
        let repo = repository("update").await;
        let mut phone = product("sku-1", "iPhone", "Apple", 999.0);
        repo.insert(&phone).await.unwrap();

        phone.price = 899.0;
        repo.update(&phone).await.unwrap();
        assert_eq!(repo.get("sku-1").await.unwrap().price, 899.0);

        repo.update_partial(&phone, json!({"name": "iPhone Pro"}))
            .await
            .unwrap();
        let updated = repo.get("sku-1").await.unwrap();
        assert_eq!(updated.name, "iPhone Pro");
        assert_eq!(updated.price, 899.0);

        let ghost = product("ghost", "Nothing", "None", 0.0);
        let err = repo.update(&ghost).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn es_integration_create_index_is_idempotent() {
        let repo = repository("create").await;
        let index = repo.index_name().to_string();

        assert!(!repo.check_index_exists(&index).await.unwrap());

        let mapping = Mapping::new()
            .property("name", Property::text().with_keyword_subfield())
            .property("brand", Property::keyword())
            .property("price", Property::double());
        assert!(repo.create_index_with_mapping(&index, &mapping).await.unwrap());
        assert!(repo.check_index_exists(&index).await.unwrap());

        repo.insert(&product("1", "iPhone", "Apple", 999.0))
            .await
            .unwrap();

        // Second create leaves the index and its documents untouched.
        assert!(!repo.create_index_with_mapping(&index, &mapping).await.unwrap());
        assert!(!repo.create_index().await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);

        repo.delete_index(&index).await.unwrap();
        assert!(!repo.check_index_exists(&index).await.unwrap());

        let err = repo.delete_index(&index).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn es_integration_insert_many_creates_index() {
        let repo = repository("bulk").await;
        let index = repo.index_name().to_string();
        assert!(!repo.check_index_exists(&index).await.unwrap());

        repo.insert_many(&catalog()).await.unwrap();
        assert!(repo.check_index_exists(&index).await.unwrap());

        let ids: Vec<String> = ["3", "missing", "1"].iter().map(|s| s.to_string()).collect();
        let found = repo.get_many(&ids).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "3");
        assert_eq!(found[1].id, "1");

        assert_eq!(repo.count().await.unwrap(), 4);
        assert_eq!(repo.get_all().await.unwrap().len(), 4);

        // Empty input is a no-op.
        repo.insert_many(&[]).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn es_integration_search_and_aggregations() {
        let repo = repository("search").await;
        repo.insert_many(&catalog()).await.unwrap();

        let phones = repo.search(&Query::match_text("name", "phone")).await.unwrap();
        assert_eq!(phones.len(), 2);

        let apple = repo
            .search(&Query::all([
                Condition::eq("brand.keyword", "Apple"),
                Condition::gte("price", 1000),
            ]))
            .await
            .unwrap();
        assert_eq!(apple.len(), 1);
        assert_eq!(apple[0].name, "MacBook");

        let aggregations = Aggregations::new()
            .add("brands", Aggregation::terms("brand.keyword", Some(10)))
            .add("avg_price", Aggregation::avg("price"));
        let response = repo
            .search_with_aggregations(&Query::MatchAll, &aggregations)
            .await
            .unwrap();
        assert_eq!(response.total, 4);
        assert_eq!(response.buckets("brands").len(), 3);
        assert_eq!(response.metric("avg_price"), Some(1124.0));
    }

    #[tokio::test]
    async fn es_integration_delete_by_query() {
        let repo = repository("delete-query").await;
        repo.insert_many(&catalog()).await.unwrap();

        let deleted = repo
            .delete_by_query(&Condition::eq("brand.keyword", "Apple").into())
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn es_integration_invalid_query_is_validation_error() {
        let repo = repository("invalid").await;
        repo.create_index().await.unwrap();

        let err = repo
            .search(&Query::Raw(json!({"no_such_query": {}})))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ElasticError::Validation(_)),
            "expected validation error, got {:?}",
            err
        );
    }

    #[tokio::test]
    async fn es_integration_autocomplete() {
        let repo = repository("autocomplete").await;
        repo.insert_many(&catalog()).await.unwrap();

        let service = ElasticsearchService::<Product>::new(client().await)
            .with_index(repo.index_name());

        // One transposed character.
        let fuzzy = service
            .auto_complete("name", "iphnoe", FuzzyMode::EditDistance)
            .await
            .unwrap();
        assert!(fuzzy.iter().any(|p| p.id == "1"));

        let fuzzy = service
            .auto_complete("NAME", "IPHNOE", FuzzyMode::Transpositions)
            .await
            .unwrap();
        assert!(fuzzy.iter().any(|p| p.id == "1"));

        let wildcard = service.auto_complete_in_between("name", "Mac").await.unwrap();
        assert_eq!(wildcard.len(), 1);
        assert_eq!(wildcard[0].id, "4");

        let prefix = service.auto_match_in_between("name", "galaxy ph").await.unwrap();
        assert_eq!(prefix.len(), 1);
        assert_eq!(prefix[0].id, "2");

        let multi = service
            .auto_match_without_sensitive(&["name".to_string(), "brand".to_string()], "goo")
            .await
            .unwrap();
        assert_eq!(multi.len(), 1);
        assert_eq!(multi[0].id, "3");

        let like = service.auto_analyze_with_like("name", "ook").await.unwrap();
        assert_eq!(like.len(), 1);
        assert_eq!(like[0].id, "4");

        let none = service.auto_match_in_between("name", "zzz").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn es_integration_service_connectivity() {
        let service = ElasticsearchService::<Product>::new(client().await);
        assert!(service.is_connected(ConnectionTarget::Primary).await.unwrap());

        let err = service
            .is_connected(ConnectionTarget::Secondary)
            .await
            .unwrap_err();
        assert!(matches!(err, ElasticError::Config { .. }));

        let service = service.with_secondary(client().await);
        assert!(service.is_connected(ConnectionTarget::Secondary).await.unwrap());
    }

    #[tokio::test]
    async fn es_integration_log_shipping() {
        use elasticsearch::indices::IndicesExistsIndexTemplateParts;
        use helios_elastic::JsonDocument;
        use helios_elastic::logging::{LoggingConfig, elastic_log_layer, index_pattern};
        use tracing_subscriber::layer::SubscriberExt;

        let client = client().await;
        let application = format!("shipping-{}", uuid::Uuid::new_v4().simple());
        let config = LoggingConfig {
            application_name: application.clone(),
            flush_interval: std::time::Duration::from_millis(50),
            ..Default::default()
        };
        let pattern = index_pattern(&config.index_format());
        assert_eq!(pattern, format!("logs-{}-*", application));

        let (layer, guard) = elastic_log_layer(&config, client.clone());
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(order = 42, "order shipped to warehouse");
        });
        guard.shutdown().await;

        let template = format!("logs-{}", application);
        let exists = client
            .inner()
            .indices()
            .exists_index_template(IndicesExistsIndexTemplateParts::Name(&template))
            .send()
            .await
            .unwrap();
        assert!(exists.status_code().is_success());

        let logs = ElasticsearchRepository::<JsonDocument>::with_index(client, pattern);
        logs.refresh().await.unwrap();
        let hits = logs
            .search(&Query::match_text("message", "warehouse"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let record = hits[0].0.clone();
        assert_eq!(record["message"], "order shipped to warehouse");
        assert_eq!(record["service.name"], application.as_str());
        assert_eq!(record["log.level"], "info");
        assert_eq!(record["labels"]["order"], 42);
        assert!(record["@timestamp"].is_string());
    }
}

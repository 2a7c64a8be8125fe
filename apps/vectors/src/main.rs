//! Vectors
//!
//! Embeds a small corpus, writes it to a vector index and prints the closest
//! document for a query. Exits non-zero when ingestion or the query fails.

use std::sync::Arc;

use clap::Parser;
use core_config::Environment;
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_vector_search::{
    AnnEngine, DistanceMetric, EmbeddingConfig, EmbeddingGenerator, EmbeddingModel, EmbeddingProviderType,
    InMemoryIndexClient, IngestionConfig, OpenSearchConfig, OpenSearchIndexClient, QdrantConfig,
    QdrantIndexClient, VectorIndexClient, VectorSearchService, provider_from_env,
};
use eyre::{Result, WrapErr, eyre};
use tracing::info;

mod config;
mod corpus;

use config::{Backend, Config};

#[derive(Parser, Debug)]
#[command(name = "vectors")]
#[command(about = "Ingest documents into a vector index and run a similarity query")]
struct Cli {
    /// Vector store endpoint
    #[arg(long = "opensearch-url", visible_alias = "url", alias = "opensearch_url")]
    opensearch_url: String,

    /// Vector store behind the endpoint
    #[arg(long, value_enum, default_value_t = Backend::OpenSearch)]
    backend: Backend,

    /// Index name [env: VECTOR_INDEX_NAME, default: vector]
    #[arg(long)]
    index: Option<String>,

    /// ANN engine (faiss, lucene, nmslib, hnsw, exact) [env: VECTOR_INDEX_ENGINE, default: faiss]
    #[arg(long)]
    engine: Option<AnnEngine>,

    /// Vector space (cosine, dot_product, euclidean) [env: VECTOR_INDEX_DISTANCE, default: cosine]
    ///
    /// faiss only accepts cosine from OpenSearch 2.19; pick euclidean or `--engine lucene` on older clusters.
    #[arg(long)]
    distance: Option<DistanceMetric>,

    /// Documents per bulk write [env: INGEST_BATCH_SIZE, default: 50]
    #[arg(long)]
    bulk_size: Option<usize>,

    /// Embedding provider (local, openai, tei) [env: EMBEDDING_PROVIDER, default: local]
    #[arg(long)]
    provider: Option<EmbeddingProviderType>,

    /// Embedding model, `name` or `name:dimension` [env: EMBEDDING_MODEL]
    #[arg(long)]
    model: Option<EmbeddingModel>,

    /// L2-normalise embeddings
    #[arg(long)]
    normalize: bool,

    /// Text to search for
    #[arg(long, default_value = "Hi World")]
    query: String,

    /// Number of results
    #[arg(short, default_value_t = 1)]
    k: usize,
}

impl Cli {
    /// Flags win over environment variables, which win over defaults
    fn into_config(self) -> Result<Config> {
        let mut ingestion = IngestionConfig::from_env().wrap_err("Invalid ingestion settings")?;
        if let Some(index) = self.index {
            ingestion.index_name = index;
        }
        if let Some(engine) = self.engine {
            ingestion.engine = engine;
        }
        if let Some(distance) = self.distance {
            ingestion.distance = distance;
        }
        if let Some(bulk_size) = self.bulk_size {
            ingestion.batch_size = bulk_size;
        }
        ingestion.validate()?;

        let mut embedding = EmbeddingConfig::from_env().wrap_err("Invalid embedding settings")?;
        if let Some(provider) = self.provider {
            embedding.provider = provider;
        }
        if let Some(model) = self.model {
            embedding.model = model;
        }
        if self.normalize {
            embedding.normalize_embeddings = true;
        }
        embedding.validate()?;

        Ok(Config {
            backend: self.backend,
            url: self.opensearch_url,
            ingestion,
            embedding,
            query: self.query,
            k: self.k,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();
    let environment = Environment::from_env();
    init_tracing(&environment);

    let config = cli.into_config()?;
    println!("Using {:?} at {}", config.backend, config.url);

    match config.backend {
        Backend::OpenSearch => {
            let client = OpenSearchIndexClient::new(OpenSearchConfig::new(config.url.clone()))?;
            run(Arc::new(client), config).await
        }
        Backend::Qdrant => {
            let client = QdrantIndexClient::new(QdrantConfig::new(config.url.clone()))?;
            run(Arc::new(client), config).await
        }
        Backend::Memory => run(Arc::new(InMemoryIndexClient::new()), config).await,
    }
}

async fn run<C: VectorIndexClient + 'static>(client: Arc<C>, config: Config) -> Result<()> {
    let provider = provider_from_env(config.embedding.provider)?;
    let generator = Arc::new(EmbeddingGenerator::new(provider, config.embedding.clone()));
    let service = VectorSearchService::new(client, generator, config.ingestion.clone());

    println!("Generate Embeddings...");
    let report = service
        .ingest(corpus::documents())
        .await
        .wrap_err("Ingestion failed")?
        .into_result()
        .wrap_err("Some documents were not indexed")?;
    info!(
        index = %service.index_name(),
        batches = report.batches,
        committed = report.committed_count(),
        "Corpus ingested"
    );

    println!("Vector Query: {}", config.query);
    let hits = service
        .query(&config.query, config.k)
        .await
        .wrap_err_with(|| format!("Query '{}' failed", config.query))?;

    for (rank, hit) in hits.iter().enumerate() {
        info!(rank, id = %hit.document.id, score = hit.score, "Hit");
    }

    let top = hits
        .first()
        .ok_or_else(|| eyre!("Index '{}' returned no results", service.index_name()))?;
    println!("Results: {}", top.document.content);

    Ok(())
}

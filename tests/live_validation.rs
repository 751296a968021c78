use std::collections::HashMap;

use rustytranslate::{
    config::Config,
    embedding::build_embedding_client,
    generation::{GenerationRequest, build_generation_client},
    qdrant::QdrantStore,
    store::{IndexEntry, IndexManifest, VectorStore},
};

fn live_config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("EMBEDDING_PROVIDER", "ollama"),
        ("EMBEDDING_MODEL", "nomic-embed-text"),
        ("EMBEDDING_DIMENSION", "768"),
        ("GENERATION_PROVIDER", "ollama"),
        ("OLLAMA_URL", "http://127.0.0.1:11434"),
        ("QDRANT_URL", "http://127.0.0.1:6333"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect();
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }
    Config::from_lookup(|key| {
        std::env::var(key)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| vars.get(key).cloned())
    })
    .expect("live config")
}

#[tokio::test]
#[ignore = "Requires live Ollama embeddings"]
async fn live_ollama_embedding_roundtrip() {
    let config = live_config(&[]);
    let client = build_embedding_client(&config).expect("client");
    let vectors = client
        .generate_embeddings(vec!["rusty-translate live embedding".to_string()])
        .await
        .expect("failed to request embeddings from provider");
    assert_eq!(vectors.len(), 1, "expected embedding per input chunk");
    assert_eq!(
        vectors[0].len(),
        config.embedding_dimension,
        "embedding dimension mismatch"
    );
}

#[tokio::test]
#[ignore = "Requires live Ollama generation"]
async fn live_ollama_generation_returns_text() {
    let config = live_config(&[]);
    let client = build_generation_client(&config).expect("client");
    let text = client
        .generate(GenerationRequest {
            model: config.generation_model.clone(),
            prompt: "Translate this Turkish text into English. Reply with only the translated text and no explanation: Günaydın".into(),
            temperature: config.rewrite_temperature,
        })
        .await
        .expect("generation");
    assert!(!text.trim().is_empty());
}

#[tokio::test]
#[ignore = "Requires live Qdrant"]
async fn live_qdrant_replace_and_search() {
    let config = live_config(&[("QDRANT_COLLECTION_NAME", "rusty-translate-live")]);
    let store = QdrantStore::new(
        &config.qdrant_url,
        config.qdrant_api_key.clone(),
        &config.qdrant_collection_name,
    )
    .expect("store");

    store
        .replace(
            IndexManifest::new("hashed", "byte-hash", 2, 2),
            vec![
                IndexEntry {
                    id: "a".into(),
                    text: "English: Hi.\nTurkish: Merhaba.".into(),
                    pair_index: 0,
                    vector: vec![1.0, 0.0],
                },
                IndexEntry {
                    id: "b".into(),
                    text: "English: Run!\nTurkish: Kaç!".into(),
                    pair_index: 1,
                    vector: vec![0.0, 1.0],
                },
            ],
        )
        .await
        .expect("replace");

    assert!(store.exists().await.expect("exists"));
    let hits = store.search(&[1.0, 0.1], 1).await.expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text, "English: Hi.\nTurkish: Merhaba.");
    let manifest = store.manifest().await.expect("manifest");
    assert_eq!(manifest.dimension, 2);
    assert!(manifest.matches_model("hashed", "byte-hash"));
}

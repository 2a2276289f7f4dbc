//! CLI command implementations

use super::output::{OutputEvent, OutputHandler};
use super::signals::{CancellationToken, setup_signal_handlers};
use crate::advisor::{Advisor, default_questions};
use crate::api::{self, AppState};
use crate::config::AdvisorConfig;
use crate::memory::{KnowledgeBase, SeedFile};
use crate::process::program_available;
use crate::providers::{EmbeddingDriver, ProviderSet, create_embedder};
use crate::template::TemplateEngine;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;

/// Open the configured knowledge base with `embedder`
fn open_knowledge(config: &AdvisorConfig, embedder: Arc<dyn EmbeddingDriver>) -> Result<KnowledgeBase> {
    let path = config.storage.resolved_db_path();
    let knowledge = KnowledgeBase::open(&path, embedder)
        .with_context(|| format!("opening knowledge base {}", path.display()))?;
    Ok(knowledge.with_location_boost(config.knowledge.location_boost))
}

/// The configured seed file, or the bundled one
fn load_seed(config: &AdvisorConfig) -> Result<SeedFile> {
    let seed = match config.knowledge.seed_file {
        Some(ref path) => SeedFile::load(path),
        None => SeedFile::bundled(),
    };
    seed.context("loading seed documents")
}

/// Run the HTTP server until SIGINT or SIGTERM
pub async fn serve(config: &AdvisorConfig) -> Result<()> {
    config.require_keys()?;

    let providers =
        ProviderSet::from_config(&config.providers).context("building provider clients")?;
    let knowledge = open_knowledge(config, providers.embedder.clone())?;

    if config.knowledge.seed_on_start {
        let added = knowledge.seed_if_empty(&load_seed(config)?).await?;
        if added > 0 {
            tracing::info!(items = added, "Seeded empty knowledge base");
        }
    }

    TemplateEngine::new()
        .validate_builtin()
        .context("built-in prompt templates")?;

    let advisor = Advisor::from_config(config, providers, Arc::new(knowledge));
    let state = Arc::new(AppState::new(advisor));

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.bind, config.server.port
            )
        })?;

    let token = CancellationToken::new();
    tokio::spawn(setup_signal_handlers(token.clone()));

    api::serve(state, addr, config.server.max_body_bytes, token.cancelled()).await
}

/// Check configuration, keys, storage and tools; returns the exit code
pub async fn doctor(config: &AdvisorConfig, handler: &dyn OutputHandler) -> i32 {
    let mut all_ok = true;
    let mut check = |name: &str, ok: bool, required: bool, detail: String| {
        if required && !ok {
            all_ok = false;
        }
        handler.emit(OutputEvent::Check {
            name: name.to_string(),
            ok,
            detail,
        });
    };

    let providers = &config.providers;
    for (name, provider, required) in [
        ("gemini", &providers.gemini, true),
        ("weather", &providers.weather, true),
        ("translate", &providers.translate, false),
        ("speech", &providers.speech, false),
    ] {
        let var = provider.api_key_env.as_deref().unwrap_or("<unset>");
        let detail = match (provider.enabled, provider.api_key().is_some()) {
            (false, _) => "disabled".to_string(),
            (true, true) => format!("{} set", var),
            (true, false) if required => format!("{} missing", var),
            (true, false) => format!("{} missing, feature degraded", var),
        };
        check(name, provider.api_key().is_some(), required, detail);
    }

    let embedding = &providers.embedding;
    if embedding.is_usable() {
        check(
            "embedding",
            true,
            false,
            format!("{} ({})", embedding.endpoint, embedding.model.as_deref().unwrap_or("default")),
        );
    } else {
        check("embedding", true, false, "offline hashing encoder".to_string());
    }

    let ffmpeg = program_available("ffmpeg").await;
    check(
        "ffmpeg",
        ffmpeg,
        false,
        if ffmpeg {
            "found".to_string()
        } else {
            "not found, speech-to-text will fail".to_string()
        },
    );

    match create_embedder(embedding)
        .map_err(anyhow::Error::from)
        .and_then(|embedder| open_knowledge(config, embedder))
    {
        Ok(knowledge) => check(
            "knowledge base",
            true,
            true,
            format!(
                "{} ({} records)",
                config.storage.resolved_db_path().display(),
                knowledge.len()
            ),
        ),
        Err(e) => check("knowledge base", false, true, format!("{:#}", e)),
    }

    match load_seed(config) {
        Ok(seed) => check(
            "seed file",
            true,
            true,
            format!("{} documents", seed.documents().len()),
        ),
        Err(e) => check("seed file", false, true, format!("{:#}", e)),
    }

    match TemplateEngine::new().validate_builtin() {
        Ok(()) => check("templates", true, true, "chat, image".to_string()),
        Err(e) => check("templates", false, true, e.to_string()),
    }

    if all_ok { 0 } else { 1 }
}

/// Seed the knowledge base; `force` seeds even when records exist
pub async fn seed(config: &AdvisorConfig, force: bool, handler: &dyn OutputHandler) -> Result<()> {
    let embedder = create_embedder(&config.providers.embedding)?;
    let knowledge = open_knowledge(config, embedder)?;
    let seed = load_seed(config)?;

    let added = if force {
        knowledge.seed(&seed).await?
    } else {
        knowledge.seed_if_empty(&seed).await?
    };

    if added == 0 && !force {
        handler.emit(OutputEvent::Info {
            message: "Knowledge base already populated; use --force to add the seed documents again"
                .into(),
        });
    }
    handler.emit(OutputEvent::Seeded {
        added,
        total: knowledge.len(),
    });
    Ok(())
}

/// Print the nearest knowledge records for a query
pub async fn search(
    config: &AdvisorConfig,
    query: &str,
    location: &str,
    top_k: Option<usize>,
    handler: &dyn OutputHandler,
) -> Result<()> {
    let embedder = create_embedder(&config.providers.embedding)?;
    let knowledge = open_knowledge(config, embedder)?;

    let results = knowledge
        .search(query, location, top_k.unwrap_or(config.knowledge.top_k))
        .await?;

    if results.is_empty() {
        handler.emit(OutputEvent::Info {
            message: "(no matching records)".into(),
        });
    }

    for (i, hit) in results.into_iter().enumerate() {
        handler.emit(OutputEvent::SearchHit {
            rank: i + 1,
            score: hit.score,
            category: hit.record.category,
            location: hit.record.location,
            content: hit.record.content,
        });
    }
    Ok(())
}

/// Print the starter questions for a language
pub fn questions(lang: &str, handler: &dyn OutputHandler) {
    for text in default_questions(lang) {
        handler.emit(OutputEvent::Question {
            text: text.to_string(),
        });
    }
}

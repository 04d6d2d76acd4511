// THEORY:
// `folio_site` is the web face of the engine. It renders every page on the server
// and exposes two small JSON endpoints that the in-page script calls while the
// visitor draws or types. The engine does all the real work; this crate only
// wires configuration, content and HTTP together.
//
// Key architectural principles:
// 1.  **One Shared Predictor**: The digit model is loaded once per process into
//     the global `PredictorService`. The load runs in the background after the
//     listener is up, so pages are served immediately and the predict endpoint
//     answers 503 until the model is ready.
// 2.  **Stateless Requests**: A predict request carries the whole drawing as
//     strokes and is replayed onto a fresh surface. No per-visitor state lives on
//     the server.
// 3.  **Feature-gated HTTP**: Everything that needs axum or leptos sits behind the
//     `web` feature. Configuration, content loading and the request logic in
//     `api` build and test without it.

pub mod api;
#[cfg(feature = "web")]
mod pages;

use anyhow::Context;
use folio_engine::content::{BlogCatalog, Portfolio};
use folio_engine::{PipelineConfig, SentimentConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:3001";
pub const DEFAULT_CONTENT_DIR: &str = "content";
pub const DEFAULT_MODEL_PATH: &str = "flatmodel_large.bin";

#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    pub bind_addr: String,
    pub content_dir: PathBuf,
    pub model_path: String,
    pub sentiment: SentimentConfig,
    pub pipeline: PipelineConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
            model_path: DEFAULT_MODEL_PATH.to_string(),
            sentiment: SentimentConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Reads `FOLIO_*` variables from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(bind) = get("FOLIO_BIND") {
            cfg.bind_addr = bind;
        }
        if let Some(dir) = get("FOLIO_CONTENT_DIR") {
            cfg.content_dir = PathBuf::from(dir);
        }
        if let Some(model) = get("FOLIO_MODEL_PATH") {
            cfg.model_path = model;
        }
        if let Some(url) = get("FOLIO_SENTIMENT_URL") {
            cfg.sentiment.endpoint = url;
        }
        if let Some(ms) = get("FOLIO_SENTIMENT_TIMEOUT_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .with_context(|| format!("FOLIO_SENTIMENT_TIMEOUT_MS must be milliseconds, got {ms:?}"))?;
            cfg.sentiment.timeout = Some(Duration::from_millis(ms));
        }

        cfg.sentiment.validate()?;
        cfg.pipeline.validate()?;
        Ok(cfg)
    }
}

/// Blog posts and the portfolio timeline, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct SiteContent {
    pub blog: BlogCatalog,
    pub portfolio: Portfolio,
}

impl SiteContent {
    /// Expects `<dir>/blog/*.md` and `<dir>/portfolio.toml`; either may be absent.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let blog = BlogCatalog::load_dir(&dir.join("blog"))?;
        let portfolio = Portfolio::load(&dir.join("portfolio.toml"))?;
        Ok(Self { blog, portfolio })
    }
}

/// Binds, spawns the server and returns its task.
#[cfg(feature = "web")]
pub async fn start_server(cfg: SiteConfig) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let (_addr, server) = bind_server(cfg).await?;
    Ok(server)
}

/// Like `start_server`, but also reports the bound address (useful with port 0).
#[cfg(feature = "web")]
pub async fn bind_server(
    cfg: SiteConfig,
) -> anyhow::Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>)> {
    use axum::extract::{Path as UrlPath, State};
    use axum::http::{HeaderValue, StatusCode, header};
    use axum::response::{Html, IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use folio_engine::core_modules::predictor::{PredictorService, UniformModule};
    use folio_engine::core_modules::readiness::ModelState;
    use folio_engine::core_modules::sentiment::{HttpSentimentScorer, SentimentScorer};
    use folio_engine::stroke_file::StrokeFile;
    use log::{error, info, warn};
    use std::sync::Arc;

    const CLIENT_JS: &str = include_str!("client.js");
    const STYLE_CSS: &str = include_str!("style.css");

    struct SiteState {
        predictor: Arc<PredictorService>,
        pipeline: PipelineConfig,
        scorer: Arc<dyn SentimentScorer>,
        content: SiteContent,
    }
    type Shared = Arc<SiteState>;

    #[derive(serde::Deserialize)]
    struct SentimentRequest {
        text: String,
    }

    fn api_error(e: api::ApiError) -> Response {
        let status = StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
    }

    fn asset(body: &'static str, content_type: &'static str) -> Response {
        let mut resp = Response::new(axum::body::Body::from(body));
        resp.headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        resp
    }

    async fn home() -> Html<String> {
        Html(pages::home())
    }

    async fn portfolio(State(state): State<Shared>) -> Html<String> {
        Html(pages::portfolio(&state.content.portfolio))
    }

    async fn blog(State(state): State<Shared>) -> Html<String> {
        Html(pages::blog(&state.content.blog, &state.content.portfolio))
    }

    async fn blog_post(State(state): State<Shared>, UrlPath(slug): UrlPath<String>) -> Response {
        match state.content.blog.find(&slug) {
            Some(post) => Html(pages::blog_post(post)).into_response(),
            None => (StatusCode::NOT_FOUND, Html(pages::not_found())).into_response(),
        }
    }

    async fn cnn_demo(State(state): State<Shared>) -> Html<String> {
        Html(pages::cnn_demo(&state.pipeline, &state.predictor.readiness().state()))
    }

    async fn sentiment_demo() -> Html<String> {
        Html(pages::sentiment_demo())
    }

    async fn predict(State(state): State<Shared>, Json(strokes): Json<StrokeFile>) -> Response {
        let service = state.predictor.clone();
        let config = state.pipeline.clone();
        match tokio::task::spawn_blocking(move || api::predict_strokes(service, &config, &strokes)).await {
            Ok(Ok(reply)) => Json(reply).into_response(),
            Ok(Err(e)) => api_error(e),
            Err(e) => {
                error!("predict task failed: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }

    async fn sentiment(State(state): State<Shared>, Json(req): Json<SentimentRequest>) -> Response {
        match api::score_text(state.scorer.as_ref(), &req.text).await {
            Ok(reply) => Json(reply).into_response(),
            Err(e) => {
                warn!("sentiment request failed: {e}");
                api_error(e)
            }
        }
    }

    async fn healthz(State(state): State<Shared>) -> String {
        format!("ok model={}", state.predictor.readiness().state())
    }

    let content = SiteContent::load(&cfg.content_dir)
        .with_context(|| format!("loading content from {}", cfg.content_dir.display()))?;

    if PredictorService::global().is_none() {
        let service = Arc::new(PredictorService::new(
            Box::new(UniformModule::new(cfg.pipeline.classes)),
            &cfg.pipeline,
        ));
        if PredictorService::install_global(service).is_err() {
            warn!("a predictor was installed concurrently; using that one");
        }
    }
    let predictor = PredictorService::global().context("global predictor missing after install")?;

    if predictor.readiness().state() == ModelState::Loading {
        let loader = predictor.clone();
        let model_path = cfg.model_path.clone();
        tokio::spawn(async move {
            if let Err(e) = loader.load(model_path).await {
                error!("digit model failed to load: {e}");
            }
        });
    }
    let watcher = predictor.clone();
    tokio::spawn(async move {
        match watcher.readiness().wait_ready().await {
            Ok(()) => info!("digit model ready, drawing surface enabled"),
            Err(reason) => warn!("drawing surface stays disabled: {reason}"),
        }
    });

    let scorer: Arc<dyn SentimentScorer> = Arc::new(HttpSentimentScorer::new(&cfg.sentiment)?);
    let state: Shared = Arc::new(SiteState {
        predictor,
        pipeline: cfg.pipeline.clone(),
        scorer,
        content,
    });

    let app = Router::new()
        .route("/", get(home))
        .route("/portfolio", get(portfolio))
        .route("/blog", get(blog))
        .route("/blog/:slug", get(blog_post))
        .route("/cnn_demo", get(cnn_demo))
        .route("/sentiment_demo", get(sentiment_demo))
        .route("/api/digit/predict", post(predict))
        .route("/api/sentiment", post(sentiment))
        .route("/client.js", get(|| async { asset(CLIENT_JS, "application/javascript") }))
        .route("/style.css", get(|| async { asset(STYLE_CSS, "text/css") }))
        .route("/healthz", get(healthz))
        .fallback(|| async { (StatusCode::NOT_FOUND, Html(pages::not_found())) })
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    let addr = listener
        .local_addr()
        .with_context(|| format!("reading local address of {}", cfg.bind_addr))?;
    info!(
        "folio site listening on http://{addr} (content={}, sentiment={})",
        cfg.content_dir.display(),
        cfg.sentiment.endpoint
    );

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("server stopped: {e}");
        }
    });
    Ok((addr, server))
}

#[cfg(not(feature = "web"))]
pub async fn start_server(_cfg: SiteConfig) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    Err(anyhow::anyhow!("web feature not enabled for folio_site"))
}

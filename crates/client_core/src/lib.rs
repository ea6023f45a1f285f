use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ObjectKey, Page, Post, StoredObject},
    protocol::{ApiMessage, GetObjectResponse, ListObjectsResponse},
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use url::Url;

pub mod markdown;

/// Wait between a create/delete call and the follow-up page refresh. The
/// backend is eventually consistent; a freshly written object may not show
/// up in a list call immediately. Empirical, not a guarantee.
pub const SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Supplies the bearer credential attached to every store call. The OAuth
/// code/state exchange itself lives behind this seam.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn is_authenticated(&self) -> Result<bool>;
    async fn token(&self) -> Result<String>;
    async fn login(&self) -> Result<()>;
    async fn logout(&self) -> Result<()>;
    async fn handle_redirect_callback(&self, code: &str, state: &str) -> Result<()>;
}

/// Session with a fixed bearer token, for tooling and tests.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn is_authenticated(&self) -> Result<bool> {
        Ok(!self.token.is_empty())
    }

    async fn token(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(anyhow!("static token session holds an empty token"));
        }
        Ok(self.token.clone())
    }

    async fn login(&self) -> Result<()> {
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        Ok(())
    }

    async fn handle_redirect_callback(&self, _code: &str, _state: &str) -> Result<()> {
        Err(anyhow!("static token sessions have no redirect flow"))
    }
}

pub struct MissingTokenProvider;

#[async_trait]
impl TokenProvider for MissingTokenProvider {
    async fn is_authenticated(&self) -> Result<bool> {
        Ok(false)
    }

    async fn token(&self) -> Result<String> {
        Err(anyhow!("no authentication session configured"))
    }

    async fn login(&self) -> Result<()> {
        Err(anyhow!("no authentication session configured"))
    }

    async fn logout(&self) -> Result<()> {
        Ok(())
    }

    async fn handle_redirect_callback(&self, _code: &str, _state: &str) -> Result<()> {
        Err(anyhow!("no authentication session configured"))
    }
}

/// Failure taxonomy for single-shot store calls. Non-2xx responses are kept
/// distinct from transport failures and carry the server-provided message
/// when one was present in the body.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token retrieval failed: {0}")]
    Auth(#[source] anyhow::Error),
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("failed to parse server response: {0}")]
    Parse(String),
}

impl StoreError {
    /// The string shown to the user for this failure. Non-2xx responses
    /// surface the server message verbatim.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Typed surface of the content-object backend. Every call is single-shot;
/// a failed operation is never retried by this layer.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list(&self, page: Page) -> Result<Vec<ObjectKey>, StoreError>;
    async fn get(&self, key: &ObjectKey) -> Result<StoredObject, StoreError>;
    async fn delete(&self, key: &ObjectKey) -> Result<String, StoreError>;
    async fn create(&self, post: &Post) -> Result<String, StoreError>;
}

/// HTTP client against the store's REST surface. Attaches a fresh bearer
/// token from the [`TokenProvider`] and no-cache semantics to every call.
pub struct ObjectStoreClient {
    http: Client,
    base: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl ObjectStoreClient {
    pub fn new(base_url: &str, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .with_context(|| format!("invalid api base url '{base_url}'"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base,
            tokens,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Builds `{base}{action}/{key}` with the key percent-encoded as a
    /// single path segment, so reserved characters in a key cannot break
    /// the request URL.
    fn keyed_endpoint(&self, action: &str, key: &ObjectKey) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::Parse("api base url cannot carry path segments".into()))?
            .pop_if_empty()
            .extend([action, key.as_str()]);
        Ok(url)
    }

    async fn bearer(&self) -> Result<String, StoreError> {
        self.tokens.token().await.map_err(StoreError::Auth)
    }

    /// Reads the response body once and classifies the outcome: non-2xx
    /// becomes [`StoreError::Status`] with the server `msg` when present,
    /// an unparseable 2xx body becomes [`StoreError::Parse`].
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
        let status = response.status();
        let text = response.text().await.map_err(StoreError::Transport)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiMessage>(&text)
                .map(|envelope| envelope.msg)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(StoreError::Status { status, message });
        }

        serde_json::from_str(&text).map_err(|err| StoreError::Parse(err.to_string()))
    }
}

#[async_trait]
impl ObjectStore for ObjectStoreClient {
    async fn list(&self, page: Page) -> Result<Vec<ObjectKey>, StoreError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.endpoint("list"))
            .query(&[("page", page.get())])
            .bearer_auth(&token)
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(StoreError::Transport)?;
        let body: ListObjectsResponse = Self::read_json(response).await?;
        if let Some(echoed) = body.page {
            if echoed != page.get() {
                warn!(
                    requested = page.get(),
                    echoed, "store: list response echoed a different page"
                );
            }
        }
        Ok(body.contents)
    }

    async fn get(&self, key: &ObjectKey) -> Result<StoredObject, StoreError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.keyed_endpoint("get", key)?)
            .bearer_auth(&token)
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(StoreError::Transport)?;
        let body: GetObjectResponse = Self::read_json(response).await?;

        let decoded = STANDARD
            .decode(body.body.as_bytes())
            .map_err(|err| StoreError::Parse(format!("invalid base64 object body: {err}")))?;
        let text = String::from_utf8(decoded)
            .map_err(|err| StoreError::Parse(format!("object body is not utf-8: {err}")))?;
        StoredObject::from_text(&text).map_err(|err| StoreError::Parse(err.to_string()))
    }

    async fn delete(&self, key: &ObjectKey) -> Result<String, StoreError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .delete(self.keyed_endpoint("delete", key)?)
            .bearer_auth(&token)
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(StoreError::Transport)?;
        let body: ApiMessage = Self::read_json(response).await?;
        Ok(body.msg)
    }

    async fn create(&self, post: &Post) -> Result<String, StoreError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .post(self.endpoint("upload"))
            .bearer_auth(&token)
            .header(header::CACHE_CONTROL, "no-cache")
            .json(post)
            .send()
            .await
            .map_err(StoreError::Transport)?;
        let body: ApiMessage = Self::read_json(response).await?;
        Ok(body.msg)
    }
}

/// Display surface driven by the browse and mutation layers. The controller
/// calls the adapter, never the reverse.
pub trait RenderAdapter: Send + Sync {
    fn render_page(&self, keys: &[ObjectKey]);
    fn set_can_advance(&self, enabled: bool);
    fn set_can_retreat(&self, enabled: bool);
    fn show_empty_page_notice(&self);
    fn show_error(&self, message: &str);
    fn show_success(&self, message: &str);
}

/// Compose-form surface consulted by the mutation layer.
#[async_trait]
pub trait FormAdapter: Send + Sync {
    fn clear(&self);
    async fn confirm_delete(&self, key: &ObjectKey) -> bool;
}

/// Injectable delay source so the settling delay is controllable in tests.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Navigation button state derived from the current page and the lookahead
/// fetch of the next page. `None` for the lookahead means the fetch failed;
/// that degrades to advance-disabled rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub can_advance: bool,
    pub can_retreat: bool,
}

pub fn compute_affordances(page: Page, lookahead: Option<&[ObjectKey]>) -> Affordances {
    Affordances {
        can_advance: lookahead.is_some_and(|keys| !keys.is_empty()),
        can_retreat: !page.is_first(),
    }
}

/// Owns the page cursor and renders listings through the [`RenderAdapter`].
///
/// "More pages exist" is never taken from backend metadata; it is recomputed
/// on every render by fetching page N+1 and checking for emptiness. The main
/// fetch is awaited before the lookahead is started, so a lookahead result
/// can only influence navigation state, never the rendered key set.
pub struct PaginationController {
    store: Arc<dyn ObjectStore>,
    view: Arc<dyn RenderAdapter>,
    page: Mutex<Page>,
    render_seq: AtomicU64,
}

impl PaginationController {
    pub fn new(store: Arc<dyn ObjectStore>, view: Arc<dyn RenderAdapter>) -> Arc<Self> {
        Arc::new(Self {
            store,
            view,
            page: Mutex::new(Page::FIRST),
            render_seq: AtomicU64::new(0),
        })
    }

    pub async fn current_page(&self) -> Page {
        *self.page.lock().await
    }

    /// Renders the current page and refreshes the navigation affordances.
    ///
    /// Renders may overlap when navigation is triggered in rapid succession;
    /// the sequence counter makes the last-started render win, so a slow
    /// stale response never overwrites a newer view.
    pub async fn render(&self) {
        let seq = self.render_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let page = *self.page.lock().await;

        let keys = match self.store.list(page).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(page = page.get(), "browse: page fetch failed: {err}");
                if self.is_current(seq) {
                    self.view
                        .show_error(&format!("failed to load page {page}: {}", err.user_message()));
                }
                return;
            }
        };

        if !self.is_current(seq) {
            info!(page = page.get(), "browse: discarding stale render");
            return;
        }

        if keys.is_empty() {
            // Informational, not an error. The cursor stays where it is so
            // the user can retreat to populated pages.
            self.view.show_empty_page_notice();
            self.view.render_page(&keys);
            self.apply_affordances(seq, compute_affordances(page, Some(&[])));
            return;
        }

        info!(page = page.get(), count = keys.len(), "browse: rendered page");
        self.view.render_page(&keys);

        let lookahead = match self.store.list(page.next()).await {
            Ok(keys) => Some(keys),
            Err(err) => {
                warn!(
                    page = page.next().get(),
                    "browse: lookahead fetch failed, disabling advance: {err}"
                );
                None
            }
        };
        self.apply_affordances(seq, compute_affordances(page, lookahead.as_deref()));
    }

    /// Moves to the next page and re-renders. Not bounds-checked beyond the
    /// UI affordance; overshooting the last page yields an empty-page render.
    pub async fn advance(&self) {
        {
            let mut page = self.page.lock().await;
            *page = page.next();
        }
        self.render().await;
    }

    /// Moves to the previous page and re-renders. No-op on the first page.
    pub async fn retreat(&self) {
        {
            let mut page = self.page.lock().await;
            if page.is_first() {
                return;
            }
            *page = page.prev();
        }
        self.render().await;
    }

    fn is_current(&self, seq: u64) -> bool {
        self.render_seq.load(Ordering::SeqCst) == seq
    }

    fn apply_affordances(&self, seq: u64, affordances: Affordances) {
        if !self.is_current(seq) {
            return;
        }
        self.view.set_can_advance(affordances.can_advance);
        self.view.set_can_retreat(affordances.can_retreat);
    }
}

/// Wraps create/delete calls and schedules the deferred page refresh that
/// papers over the backend's eventual consistency.
///
/// A mutation never touches the page cursor; it only asks the browse layer
/// to re-render after [`SETTLE_DELAY`].
pub struct MutationCoordinator {
    store: Arc<dyn ObjectStore>,
    view: Arc<dyn RenderAdapter>,
    form: Arc<dyn FormAdapter>,
    browser: Arc<PaginationController>,
    scheduler: Arc<dyn Scheduler>,
    settle: Duration,
}

impl MutationCoordinator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        view: Arc<dyn RenderAdapter>,
        form: Arc<dyn FormAdapter>,
        browser: Arc<PaginationController>,
    ) -> Self {
        Self::with_scheduler(store, view, form, browser, Arc::new(TokioScheduler), SETTLE_DELAY)
    }

    pub fn with_scheduler(
        store: Arc<dyn ObjectStore>,
        view: Arc<dyn RenderAdapter>,
        form: Arc<dyn FormAdapter>,
        browser: Arc<PaginationController>,
        scheduler: Arc<dyn Scheduler>,
        settle: Duration,
    ) -> Self {
        Self {
            store,
            view,
            form,
            browser,
            scheduler,
            settle,
        }
    }

    /// Validates and uploads a post. A validation failure short-circuits
    /// before any network call. The refresh is scheduled only on success;
    /// on a rejected upload the form keeps its contents so the user can
    /// correct and resubmit.
    pub async fn submit_create(&self, post: &Post) {
        if let Err(err) = post.validate() {
            self.view.show_error(&err.to_string());
            return;
        }

        match self.store.create(post).await {
            Ok(msg) => {
                info!(title = %post.title, "compose: post created");
                self.view.show_success(&msg);
                self.form.clear();
                self.schedule_refresh();
            }
            Err(err) => {
                warn!(title = %post.title, "compose: create failed: {err}");
                self.view.show_error(&err.user_message());
            }
        }
    }

    /// Confirms and deletes an object. The deferred refresh is scheduled
    /// regardless of how the delete call itself reported; the listing is
    /// the source of truth either way.
    pub async fn submit_delete(&self, key: &ObjectKey) {
        if !self.form.confirm_delete(key).await {
            info!(key = %key, "compose: delete cancelled");
            return;
        }

        match self.store.delete(key).await {
            Ok(msg) => {
                info!(key = %key, "compose: object deleted");
                self.view.show_success(&msg);
            }
            Err(err) => {
                warn!(key = %key, "compose: delete failed: {err}");
                self.view.show_error(&err.user_message());
            }
        }

        self.schedule_refresh();
    }

    fn schedule_refresh(&self) {
        let browser = Arc::clone(&self.browser);
        let scheduler = Arc::clone(&self.scheduler);
        let settle = self.settle;
        tokio::spawn(async move {
            scheduler.sleep(settle).await;
            browser.render().await;
        });
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

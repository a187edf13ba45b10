use crate::directive::{self, IncludeRequest, Phase};
use crate::error::{MergeError, MergeResult};
use crate::fetch::{FetchProvider, MarkdownRenderer};
use crate::resolvers::{self, Applied, Resolution};
use crate::value::Value;
use futures::stream::{FuturesUnordered, StreamExt};
use merge_parser::{Document, NodeId};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Where the orchestrator is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    Idle,
    ContextLoading,
    Resolving(Phase),
    Draining,
    Done,
}

/// Context handed to [`Merge::load_state`]
#[derive(Debug, Clone)]
pub enum StateSource {
    Object(Value),
    /// Fetched through the fetch provider and parsed as JSON
    Locator(String),
}

impl From<Value> for StateSource {
    fn from(value: Value) -> Self {
        StateSource::Object(value)
    }
}

impl From<serde_json::Value> for StateSource {
    fn from(value: serde_json::Value) -> Self {
        StateSource::Object(value.into())
    }
}

/// Deferred work, drained strictly in FIFO order
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingTask {
    LoadState(String),
    Parse,
}

/// A branch whose directive could not be resolved. The node was left as is.
#[derive(Debug)]
pub struct BranchError {
    pub phase: Phase,
    pub node: NodeId,
    pub error: MergeError,
}

/// Summary of one pass
#[derive(Debug, Default)]
pub struct PassReport {
    pub pass: u32,
    pub resolved: usize,
    pub removed: usize,
    /// Matched nodes that were already detached when their turn came
    pub skipped: usize,
    pub fetches: usize,
    pub errors: Vec<BranchError>,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, applied: Applied) {
        match applied {
            Applied::Replaced(_) => self.resolved += 1,
            Applied::Removed => self.removed += 1,
            Applied::Unchanged => {}
        }
    }
}

/// Owns a document and a context and resolves merge directives over it.
///
/// ```no_run
/// # async fn run() -> merge_engine::MergeResult<()> {
/// use merge_engine::{Merge, StateSource, Value};
///
/// let document = merge_parser::parse(r#"<h1 merge-content="title"></h1>"#)?;
/// let mut merge = Merge::new();
/// merge.attach(document);
/// merge
///     .load_state(StateSource::Object(Value::from_json_str(r#"{"title":"Hi"}"#).unwrap()))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Merge {
    document: Option<Document>,
    state: Option<Value>,
    fetch: Option<Arc<dyn FetchProvider>>,
    renderer: Option<Arc<dyn MarkdownRenderer>>,
    status: MergeStatus,
    pending: VecDeque<PendingTask>,
}

impl Merge {
    pub fn new() -> Self {
        Self {
            document: None,
            state: None,
            fetch: None,
            renderer: None,
            status: MergeStatus::Idle,
            pending: VecDeque::new(),
        }
    }

    pub fn builder() -> MergeBuilder {
        MergeBuilder::default()
    }

    pub fn attach(&mut self, document: Document) {
        self.document = Some(document);
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn into_document(self) -> Option<Document> {
        self.document
    }

    pub fn state(&self) -> Option<&Value> {
        self.state.as_ref()
    }

    pub fn status(&self) -> MergeStatus {
        self.status
    }

    /// Install the context. The first load wins; later calls are ignored.
    ///
    /// If a document is attached, a pass runs once the context is in place
    /// and its report is returned.
    pub async fn load_state(&mut self, source: StateSource) -> MergeResult<Option<PassReport>> {
        if self.state.is_some() {
            debug!("Context already loaded, ignoring");
            return Ok(None);
        }

        match source {
            StateSource::Object(value) => {
                self.state = Some(value);
            }
            StateSource::Locator(locator) => {
                self.status = MergeStatus::ContextLoading;
                self.pending.push_back(PendingTask::LoadState(locator));
            }
        }
        if self.document.is_some() {
            self.pending.push_back(PendingTask::Parse);
        }
        self.drain().await
    }

    /// Run one pass over the attached document
    pub async fn parse(&mut self) -> MergeResult<PassReport> {
        if self.document.is_none() {
            return Err(MergeError::configuration("no document attached"));
        }
        self.pending.push_back(PendingTask::Parse);
        match self.drain().await? {
            Some(report) => Ok(report),
            None => Err(MergeError::configuration("no document attached")),
        }
    }

    async fn drain(&mut self) -> MergeResult<Option<PassReport>> {
        let mut last = None;
        while let Some(task) = self.pending.pop_front() {
            let outcome = match task {
                PendingTask::LoadState(locator) => self.fetch_state(&locator).await,
                PendingTask::Parse => self.run_pass().await.map(|report| {
                    last = Some(report);
                }),
            };
            if let Err(err) = outcome {
                self.pending.clear();
                self.status = MergeStatus::Done;
                return Err(err);
            }
            self.status = MergeStatus::Draining;
        }
        self.status = if last.is_some() {
            MergeStatus::Done
        } else {
            MergeStatus::Idle
        };
        Ok(last)
    }

    #[instrument(skip(self))]
    async fn fetch_state(&mut self, locator: &str) -> MergeResult<()> {
        self.status = MergeStatus::ContextLoading;
        let fetch = self
            .fetch
            .as_ref()
            .ok_or_else(|| MergeError::configuration("a context locator needs a fetch provider"))?;
        let value = fetch.fetch(locator).await?.json()?;
        debug!("Context loaded");
        self.state = Some(value);
        Ok(())
    }

    #[instrument(skip(self), fields(pass = tracing::field::Empty))]
    async fn run_pass(&mut self) -> MergeResult<PassReport> {
        let Some(document) = self.document.as_mut() else {
            return Err(MergeError::configuration("no document attached"));
        };
        let stamp = document.next_pass();
        tracing::Span::current().record("pass", stamp);
        let null = Value::Null;
        let context = self.state.as_ref().unwrap_or(&null);
        let mut pass = Pass::new(document, context, stamp);

        for phase in Phase::ALL {
            self.status = MergeStatus::Resolving(phase);
            match phase {
                Phase::Conditional => pass.conditionals(),
                Phase::Include => {
                    pass.includes(self.fetch.as_deref(), self.renderer.as_deref())
                        .await?
                }
                Phase::Repeat => pass.repeats(),
                Phase::Content => pass.contents(),
                Phase::Cleanup => pass.cleanup(),
            }
        }

        let report = pass.report;
        info!(
            resolved = report.resolved,
            removed = report.removed,
            fetches = report.fetches,
            errors = report.errors.len(),
            "Merge pass complete"
        );
        Ok(report)
    }
}

impl Default for Merge {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct MergeBuilder {
    document: Option<Document>,
    fetch: Option<Arc<dyn FetchProvider>>,
    renderer: Option<Arc<dyn MarkdownRenderer>>,
}

impl MergeBuilder {
    pub fn document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    pub fn fetch(mut self, fetch: impl FetchProvider + 'static) -> Self {
        self.fetch = Some(Arc::new(fetch));
        self
    }

    pub fn shared_fetch(mut self, fetch: Arc<dyn FetchProvider>) -> Self {
        self.fetch = Some(fetch);
        self
    }

    pub fn renderer(mut self, renderer: impl MarkdownRenderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn shared_renderer(mut self, renderer: Arc<dyn MarkdownRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn build(self) -> Merge {
        Merge {
            document: self.document,
            fetch: self.fetch,
            renderer: self.renderer,
            ..Merge::new()
        }
    }
}

/// State of a single pass over the tree
struct Pass<'a> {
    document: &'a mut Document,
    context: &'a Value,
    stamp: u32,
    report: PassReport,
}

impl<'a> Pass<'a> {
    fn new(document: &'a mut Document, context: &'a Value, stamp: u32) -> Self {
        Self {
            document,
            context,
            stamp,
            report: PassReport {
                pass: stamp,
                ..Default::default()
            },
        }
    }

    /// Snapshot of attached nodes carrying any selector, excluding nodes this
    /// pass generated
    fn matches(&self, phase: Phase) -> Vec<NodeId> {
        self.document
            .query_attribute(&phase.selectors())
            .into_iter()
            .filter(|&id| self.document.stamp(id) != self.stamp)
            .collect()
    }

    /// Whether a snapshotted node still takes part in the pass
    fn live(&mut self, id: NodeId) -> bool {
        if self.document.is_attached(id) {
            return true;
        }
        self.report.skipped += 1;
        false
    }

    fn commit(&mut self, id: NodeId, resolution: Resolution) {
        let applied = resolvers::apply(self.document, id, resolution);
        self.report.record(applied);
    }

    fn fail(&mut self, phase: Phase, node: NodeId, error: MergeError) {
        warn!(%phase, %error, "Directive left unresolved");
        self.report.errors.push(BranchError { phase, node, error });
    }

    fn conditionals(&mut self) {
        for id in self.matches(Phase::Conditional) {
            if !self.live(id) {
                continue;
            }
            let fragment = self.document.extract(id);
            let resolution = resolvers::conditional(fragment, self.context);
            self.commit(id, resolution);
        }
    }

    /// Fetches for every matched node run concurrently; each result is
    /// committed as it arrives. The phase ends when all have committed.
    async fn includes(
        &mut self,
        fetch: Option<&dyn FetchProvider>,
        renderer: Option<&dyn MarkdownRenderer>,
    ) -> MergeResult<()> {
        let requests: Vec<(NodeId, IncludeRequest)> = self
            .matches(Phase::Include)
            .into_iter()
            .filter_map(|id| IncludeRequest::read(&*self.document, id).map(|request| (id, request)))
            .collect();
        if requests.is_empty() {
            return Ok(());
        }
        if renderer.is_none() && requests.iter().any(|(_, request)| request.markdown) {
            return Err(MergeError::configuration(
                "merge-include-markdown used but no markdown renderer is configured",
            ));
        }
        let Some(fetch) = fetch else {
            return Err(MergeError::configuration(
                "merge-include used but no fetch provider is configured",
            ));
        };

        let mut in_flight: FuturesUnordered<_> = requests
            .into_iter()
            .map(|(id, request)| async move {
                let response = fetch.fetch(&request.locator).await;
                (id, request, response)
            })
            .collect();

        while let Some((id, request, response)) = in_flight.next().await {
            let response = response?;
            self.report.fetches += 1;
            debug!(locator = %request.locator, "Fetched include");
            if !self.live(id) {
                continue;
            }

            let markup = match (request.markdown, renderer) {
                (true, Some(renderer)) => renderer.render(response.text()),
                _ => response.into_text(),
            };
            let fragment = self.document.extract(id);
            match resolvers::include(fragment, &markup, request.append, self.stamp) {
                Ok(resolution) => self.commit(id, resolution),
                Err(error) => self.fail(Phase::Include, id, error),
            }
        }
        Ok(())
    }

    fn repeats(&mut self) {
        for id in self.matches(Phase::Repeat) {
            if !self.live(id) {
                continue;
            }
            let fragment = self.document.extract(id);
            match resolvers::repeat(fragment, self.context, self.stamp) {
                Ok(resolution) => self.commit(id, resolution),
                Err(error) => self.fail(Phase::Repeat, id, error),
            }
        }
    }

    fn contents(&mut self) {
        for id in self.matches(Phase::Content) {
            if !self.live(id) {
                continue;
            }
            let fragment = self.document.extract(id);
            match resolvers::content(fragment, self.context, self.stamp) {
                Ok(resolution) => self.commit(id, resolution),
                Err(error) => self.fail(Phase::Content, id, error),
            }
        }
    }

    /// Removes reserved script blocks, including ones generated this pass
    fn cleanup(&mut self) {
        let scripts: Vec<NodeId> = self
            .document
            .find_by_tag("script")
            .into_iter()
            .filter(|&id| directive::is_merge_script(&*self.document, id))
            .collect();
        for id in scripts {
            if !self.live(id) {
                continue;
            }
            self.commit(id, resolvers::cleanup());
        }
    }
}

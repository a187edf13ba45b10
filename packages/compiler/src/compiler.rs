use crate::error::{CompileError, CompileResult};
use crate::fetch::CompilerFetch;
use crate::markdown::CommonMarkRenderer;
use merge_common::{FileSystem, RealFileSystem, Reporter};
use merge_engine::directive::declared_state;
use merge_engine::{MarkdownRenderer, Merge, PassReport, StateSource, Value};
use merge_parser::{parse, serialize_with, Document, SerializeOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Options for compiling files and directories
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Output directory for [`Compiler::compile_directory`]; `<dir>/build` when unset
    pub destination: Option<PathBuf>,
    /// JSON file providing the context for every page
    pub state: Option<PathBuf>,
    /// Pretty print HTML
    pub pretty: bool,
    /// Indentation string
    pub indent: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            destination: None,
            state: None,
            pretty: true,
            indent: "  ".to_string(),
        }
    }
}

/// Result of compiling one page
#[derive(Debug)]
pub struct CompiledFile {
    pub source: PathBuf,
    pub output: String,
    pub report: PassReport,
}

/// Outcome of a directory build. Failed files do not stop the others.
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub destination: PathBuf,
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BuildSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs the merge engine over the pages of a site
pub struct Compiler {
    fs: Arc<dyn FileSystem>,
    renderer: Arc<dyn MarkdownRenderer>,
    http: reqwest::Client,
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_file_system(Arc::new(RealFileSystem))
    }

    pub fn with_file_system(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            renderer: Arc::new(CommonMarkRenderer::new()),
            http: reqwest::Client::new(),
        }
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Read a JSON context file
    pub fn load_state(&self, path: &Path) -> CompileResult<Value> {
        let text = self.fs.read_to_string(path).map_err(|error| CompileError::Read {
            path: path.to_path_buf(),
            error,
        })?;
        Value::from_json_str(&text).map_err(|e| CompileError::State {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Run one merge pass over `markup`, which belongs to `file` in the site
    /// rooted at `root_dir`.
    ///
    /// Without an explicit context, a context declared by the page itself is
    /// fetched; otherwise the pass runs without one.
    #[instrument(skip(self, markup, context), fields(file = %file.display()))]
    pub async fn merge_markup(
        &self,
        root_dir: &Path,
        file: &Path,
        markup: &str,
        context: Option<&Value>,
    ) -> CompileResult<(Document, PassReport)> {
        let document = parse(markup).map_err(|error| CompileError::Parse {
            path: file.to_path_buf(),
            error,
            markup: markup.to_string(),
        })?;
        let declared = match context {
            Some(_) => None,
            None => declared_state(&document),
        };

        let fetch = CompilerFetch::new(root_dir, file, self.fs.clone(), self.http.clone());
        let mut merge = Merge::builder()
            .document(document)
            .fetch(fetch)
            .shared_renderer(self.renderer.clone())
            .build();

        let outcome = match (context, declared) {
            (Some(value), _) => merge.load_state(StateSource::Object(value.clone())).await,
            (None, Some(locator)) => merge.load_state(StateSource::Locator(locator)).await,
            (None, None) => merge.parse().await.map(Some),
        };
        let report = outcome
            .map_err(|error| CompileError::Merge {
                path: file.to_path_buf(),
                error,
            })?
            .unwrap_or_default();

        for branch in &report.errors {
            warn!(phase = %branch.phase, error = %branch.error, "Unresolved directive");
        }
        Ok((merge.into_document().unwrap_or_default(), report))
    }

    pub fn render(&self, document: &Document, options: &CompileOptions) -> String {
        serialize_with(
            document,
            &SerializeOptions {
                pretty: options.pretty,
                indent: options.indent.clone(),
            },
        )
    }

    /// Compile a single page of the site rooted at `root_dir`
    pub async fn compile_file(
        &self,
        root_dir: &Path,
        file: &Path,
        options: &CompileOptions,
    ) -> CompileResult<CompiledFile> {
        let context = match &options.state {
            Some(path) => Some(self.load_state(path)?),
            None => None,
        };
        self.compile_with_context(root_dir, file, options, context.as_ref())
            .await
    }

    async fn compile_with_context(
        &self,
        root_dir: &Path,
        file: &Path,
        options: &CompileOptions,
        context: Option<&Value>,
    ) -> CompileResult<CompiledFile> {
        let markup = self.fs.read_to_string(file).map_err(|error| CompileError::Read {
            path: file.to_path_buf(),
            error,
        })?;
        let (document, report) = self.merge_markup(root_dir, file, &markup, context).await?;
        Ok(CompiledFile {
            source: file.to_path_buf(),
            output: self.render(&document, options),
            report,
        })
    }

    /// Compile every `.html` file below `dir` into the destination directory,
    /// mirroring relative paths. The destination itself is never read.
    #[instrument(skip(self, options, reporter), fields(dir = %dir.display()))]
    pub async fn compile_directory(
        &self,
        dir: &Path,
        options: &CompileOptions,
        reporter: &Reporter,
    ) -> CompileResult<BuildSummary> {
        if !self.fs.exists(dir) || self.fs.is_file(dir) {
            return Err(CompileError::NotADirectory(dir.to_path_buf()));
        }
        let destination = options
            .destination
            .clone()
            .unwrap_or_else(|| dir.join("build"));
        let context = match &options.state {
            Some(path) => Some(self.load_state(path)?),
            None => None,
        };

        let files: Vec<PathBuf> = self
            .fs
            .list_files(dir)
            .map_err(|error| CompileError::Read {
                path: dir.to_path_buf(),
                error,
            })?
            .into_iter()
            .filter(|file| is_html(file) && !file.starts_with(&destination))
            .collect();

        reporter.heading(&format!(
            "Building {} files from {}",
            files.len(),
            dir.display()
        ));

        let mut summary = BuildSummary {
            destination: destination.clone(),
            ..Default::default()
        };
        for file in files {
            let relative = file.strip_prefix(dir).unwrap_or(&file).to_path_buf();
            let target = destination.join(&relative);

            let written = match self
                .compile_with_context(dir, &file, options, context.as_ref())
                .await
            {
                Ok(compiled) => {
                    for branch in &compiled.report.errors {
                        reporter.warn(&format!("{}: {}", relative.display(), branch.error));
                    }
                    self.fs
                        .write(&target, &compiled.output)
                        .map_err(|error| CompileError::Write {
                            path: target.clone(),
                            error,
                        })
                }
                Err(e) => Err(e),
            };

            match written {
                Ok(()) => {
                    reporter.file_written(&relative, &target);
                    summary.written.push(target);
                }
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Failed to compile");
                    reporter.file_failed(&relative, &e.pretty());
                    summary.failed.push((file, e.to_string()));
                }
            }
        }

        info!(
            written = summary.written.len(),
            failed = summary.failed.len(),
            "Build complete"
        );
        Ok(summary)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `path` names an HTML page
pub fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
        .unwrap_or(false)
}

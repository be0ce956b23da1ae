//! CLI route: run context and command dispatch. Wires configuration into the
//! backend, router, converter and orchestrator, then drives the event stream.

use crate::cli::output::RunOutcome;
use crate::cli::parse::Commands;
use crate::cli::presentation::{format_event_json, format_models_json, format_models_text, TextRenderer};
use crate::config::{AppConfig, ConfigLoader};
use crate::converter::PandocConverter;
use crate::document::PlanOptions;
use crate::error::ApiError;
use crate::orchestrator::{GenerationRequest, Orchestrator};
use crate::progress::{ProgressEvent, RunStatus};
use crate::provider::BackendRegistry;
use crate::retry::RetryPolicy;
use crate::router::Router;
use crate::task::{InMemoryTaskStore, TaskStore};
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Runtime context for CLI execution: workspace and loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: AppConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = ConfigLoader::new(&workspace_root)
            .with_config_file(config_path)
            .build()?;
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn from_config(workspace_root: PathBuf, config: AppConfig) -> Result<Self, ApiError> {
        config.ensure_valid()?;
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn router(&self) -> Result<Arc<Router>, ApiError> {
        let backend = BackendRegistry::create(&self.config.provider, &self.config.backend_settings())?;
        let policy = RetryPolicy::from(&self.config.retry);
        Ok(Arc::new(Router::new(backend, policy)))
    }

    fn orchestrator(&self, output_dir: Option<PathBuf>) -> Result<Orchestrator, ApiError> {
        let output = &self.config.output;
        let converter = PandocConverter::new(output.converter.clone())
            .with_leading_args(output.converter_args.clone())
            .with_reference_doc(output.resolve_reference_doc(&self.workspace_root))
            .with_timeout(output.conversion_timeout());
        let output_dir = match output_dir {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => self.workspace_root.join(dir),
            None => output.resolve_dir(&self.workspace_root),
        };
        let tasks: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        Ok(Orchestrator::new(self.router()?, Arc::new(converter), tasks, output_dir))
    }

    /// Execute a command, writing results to `out`
    pub fn execute<W: Write>(&self, command: &Commands, out: &mut W) -> Result<RunOutcome, ApiError> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| ApiError::ConfigError(format!("Failed to create runtime: {}", e)))?;
        runtime.block_on(self.execute_async(command, out))
    }

    async fn execute_async<W: Write>(&self, command: &Commands, out: &mut W) -> Result<RunOutcome, ApiError> {
        match command {
            Commands::Generate {
                topic,
                model,
                structure,
                chapters,
                words,
                references,
                citation_style,
                output_dir,
                format,
            } => {
                let model = match model {
                    Some(model) => model.clone(),
                    None => self.config.default_model()?,
                };
                let request = GenerationRequest::new(topic.clone(), model)
                    .with_structure(*structure)
                    .with_options(PlanOptions {
                        chapter_count: *chapters,
                        word_count: *words,
                        include_references: *references,
                        citation_style: citation_style.clone(),
                    });
                let orchestrator = self.orchestrator(output_dir.clone())?;
                self.generate(&orchestrator, request, format == "json", out).await
            }
            Commands::Models { format } => {
                let router = self.router()?;
                let models = router.list_models().await?;
                let rendered = if format == "json" {
                    format_models_json(router.provider_name(), &models)?
                } else {
                    format_models_text(router.provider_name(), &models)
                };
                writeln!(out, "{}", rendered)?;
                Ok(RunOutcome::Finished(RunStatus::Complete))
            }
        }
    }

    async fn generate<W: Write>(
        &self,
        orchestrator: &Orchestrator,
        request: GenerationRequest,
        json: bool,
        out: &mut W,
    ) -> Result<RunOutcome, ApiError> {
        let run = orchestrator.start(request);
        let task_id = run.task_id();
        info!(%task_id, "Generation started");

        // Ctrl-C flags the task; the run stops at its next step boundary
        let tasks = orchestrator.tasks();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(%task_id, "Interrupt received, aborting at next step");
                tasks.request_abort(&task_id);
            }
        });

        let mut renderer = TextRenderer::new(self.config.logging.color);
        let mut events = run.into_stream();
        let mut last: Option<ProgressEvent> = None;
        while let Some(event) = events.next().await {
            if json {
                writeln!(out, "{}", format_event_json(&event)?)?;
            } else {
                for line in renderer.render(&event) {
                    writeln!(out, "{}", line)?;
                }
            }
            out.flush()?;
            last = Some(event);
        }
        interrupt.abort();

        Ok(match last.and_then(|event| event.status) {
            Some(status) => RunOutcome::Finished(status),
            None => RunOutcome::Failed,
        })
    }
}

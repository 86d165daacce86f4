//! Command orchestrator: the top-level entry point.
//!
//! Thin composition layer over the parser client, classifier, and
//! dispatcher. A command moves through `PARSING → CLASSIFIED →
//! DISPATCHING`; parser failures are non-fatal (the classifier runs on
//! keyword evidence and the failure becomes a diagnostic), classifier
//! errors fail the command before any handler runs, and cancellation is
//! honored at every suspension point.

use crate::catalog::EventCatalog;
use crate::classifier::Classifier;
use crate::config::OrchestratorConfig;
use crate::dispatch::{CommandResult, Dispatcher};
use crate::error::{CommandError, CoreResult};
use crate::logging::{log_debug, log_info};
use crate::parser::ParserClient;
use crate::registry::HandlerRegistry;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Wires parser → classifier → dispatcher for one deployment.
///
/// The catalog and registry are explicit dependencies: startup builds
/// them once, immutably, and tests inject fakes.
///
/// # Example
///
/// ```rust,ignore
/// let catalog = Arc::new(EventCatalog::builtin()?);
/// let parser = Arc::new(HttpParserClient::new(config.parser.clone(), catalog.clone())?);
/// let orchestrator = CommandOrchestrator::new(config, catalog, parser, registry);
///
/// let result = orchestrator.process_command("Filled up gas, 12 gallons, $45", None).await?;
/// assert_eq!(result.status, CommandStatus::Ok);
/// ```
pub struct CommandOrchestrator {
    parser: Arc<dyn ParserClient>,
    classifier: Classifier,
    dispatcher: Dispatcher,
    config: OrchestratorConfig,
}

impl CommandOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        catalog: Arc<EventCatalog>,
        parser: Arc<dyn ParserClient>,
        registry: Arc<HandlerRegistry>,
    ) -> Self {
        let classifier = Classifier::new(catalog, config.classifier.clone());
        let dispatcher = Dispatcher::new(registry, config.dispatch.clone());
        Self {
            parser,
            classifier,
            dispatcher,
            config,
        }
    }

    /// Process one command under the configured overall deadline.
    ///
    /// # Errors
    ///
    /// Classification failures ([`CommandError::Unclassifiable`],
    /// [`CommandError::Validation`], [`CommandError::LowConfidence`]) and
    /// [`CommandError::Cancelled`] surface here; handler failures are
    /// folded into the returned [`CommandResult`] instead.
    pub async fn process_command(
        &self,
        utterance: &str,
        session_id: Option<&str>,
    ) -> CoreResult<CommandResult> {
        let deadline = Instant::now() + self.config.command_timeout();
        self.process_command_with_deadline(utterance, session_id, deadline, &CancellationToken::new())
            .await
    }

    /// Process one command with an explicit deadline and cancellation
    /// token. Cancelling before the parser returns guarantees no handler
    /// is invoked.
    pub async fn process_command_with_deadline(
        &self,
        utterance: &str,
        session_id: Option<&str>,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> CoreResult<CommandResult> {
        if cancel.is_cancelled() {
            return Err(CommandError::cancelled());
        }

        log_info!(
            session_id = session_id.unwrap_or("-"),
            utterance_len = utterance.len(),
            "Processing command"
        );

        // PARSING. Non-fatal: on failure the classifier runs without
        // parser input and the failure joins the diagnostics. The outer
        // timeout guards against clients that ignore their deadline.
        let remaining = deadline.saturating_duration_since(Instant::now());
        let parser_budget = self.config.parser.timeout().min(remaining);
        let interpretation = match tokio::time::timeout(
            parser_budget,
            self.parser.interpret(utterance, parser_budget, cancel),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(CommandError::parser_timeout(parser_budget.as_millis() as u64)),
        };
        let (parser_output, mut diagnostics) = match interpretation {
            Ok(output) => (Some(output), Vec::new()),
            Err(CommandError::Cancelled) => return Err(CommandError::cancelled()),
            Err(error) => {
                log_debug!(error = %error, "Parser failed; classifying from keywords only");
                (None, vec![format!("parser failed: {error}")])
            }
        };

        if cancel.is_cancelled() {
            return Err(CommandError::cancelled());
        }

        // CLASSIFIED. Fatal on error.
        let mut classification = self.classifier.classify(utterance, parser_output.as_ref())?;
        diagnostics.append(&mut classification.diagnostics);
        classification.diagnostics = diagnostics;

        if cancel.is_cancelled() {
            return Err(CommandError::cancelled());
        }

        // DISPATCHING. Handler failures live inside the result.
        Ok(self.dispatcher.dispatch(classification, deadline, cancel).await)
    }
}

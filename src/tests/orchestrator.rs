//! Unit Tests for the Command Orchestrator
//!
//! UNIT UNDER TEST: CommandOrchestrator (composition layer)
//!
//! BUSINESS RESPONSIBILITY:
//!   - Run parser → classifier → dispatcher in order
//!   - Treat parser failures as diagnostics, never as command failures
//!   - Fail the command on classifier errors before any handler runs
//!   - Honor cancellation at every suspension point
//!
//! TEST COVERAGE:
//!   - Parser failure with keyword carry-through
//!   - Classification errors short-circuiting dispatch
//!   - Cancellation before the parser returns (no handler invocations)
//!
//! Full end-to-end scenarios live in tests/orchestrator_integration_tests.rs.

use crate::catalog::TargetModule;
use crate::config::OrchestratorConfig;
use crate::dispatch::CommandStatus;
use crate::error::{CommandError, CoreResult};
use crate::orchestrator::CommandOrchestrator;
use crate::parser::{MockParserClient, ParserClient, ParserOutput};
use crate::tests::helpers::{builtin_catalog, registry_with, HandlerScript, ScriptedHandler};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod tests {
    use super::*;

    fn orchestrator_with(
        parser: Arc<dyn ParserClient>,
        handlers: &[(TargetModule, Arc<ScriptedHandler>)],
    ) -> CommandOrchestrator {
        CommandOrchestrator::new(
            OrchestratorConfig::default(),
            builtin_catalog(),
            parser,
            registry_with(handlers),
        )
    }

    /// Parser fake that only resolves through cancellation.
    struct HangingParser;

    #[async_trait]
    impl ParserClient for HangingParser {
        async fn interpret(
            &self,
            _utterance: &str,
            _deadline: Duration,
            cancel: &CancellationToken,
        ) -> CoreResult<ParserOutput> {
            cancel.cancelled().await;
            Err(CommandError::cancelled())
        }
    }

    #[tokio::test]
    async fn test_parser_failure_becomes_a_diagnostic_and_keywords_carry() {
        // The parser is down; "Oil change, $59.99" still lands a
        // maintenance event and its purchase secondary.

        // Arrange
        let mut parser = MockParserClient::new();
        parser
            .expect_interpret()
            .returning(|_, _, _| Err(CommandError::parser_unavailable("connection refused")));
        let fleet = ScriptedHandler::new(HandlerScript::Succeed);
        let accounting = ScriptedHandler::new(HandlerScript::Succeed);
        let orchestrator = orchestrator_with(
            Arc::new(parser),
            &[
                (TargetModule::Fleet, fleet.clone()),
                (TargetModule::Accounting, accounting.clone()),
            ],
        );

        // Act
        let result = orchestrator
            .process_command("Oil change, $59.99", Some("session-1"))
            .await
            .unwrap();

        // Assert
        assert_eq!(result.status, CommandStatus::Ok);
        assert_eq!(result.events_processed, 2);
        assert!(
            result.diagnostics.iter().any(|d| d.contains("parser failed")),
            "The parser outage must surface as a diagnostic, got {:?}",
            result.diagnostics
        );
        assert_eq!(fleet.call_count(), 1);
        assert_eq!(accounting.call_count(), 1);
    }

    #[tokio::test]
    async fn test_classifier_errors_fail_the_command_before_any_handler() {
        // Arrange - parser proposes pump but "Refueled" has no data
        let mut parser = MockParserClient::new();
        parser.expect_interpret().returning(|_, _, _| {
            let catalog = crate::tests::helpers::builtin_catalog();
            ParserOutput::from_json(
                &serde_json::json!({"proposed_event_types": ["pump"]}),
                &catalog,
            )
        });
        let fleet = ScriptedHandler::new(HandlerScript::Succeed);
        let orchestrator =
            orchestrator_with(Arc::new(parser), &[(TargetModule::Fleet, fleet.clone())]);

        // Act
        let result = orchestrator.process_command("Refueled", None).await;

        // Assert
        assert!(matches!(result, Err(CommandError::Validation { .. })));
        assert_eq!(
            fleet.call_count(),
            0,
            "Validation failures must never reach a handler"
        );
    }

    #[tokio::test]
    async fn test_cancelling_before_the_parser_returns_invokes_no_handler() {
        // Arrange
        let fleet = ScriptedHandler::new(HandlerScript::Succeed);
        let accounting = ScriptedHandler::new(HandlerScript::Succeed);
        let orchestrator = orchestrator_with(
            Arc::new(HangingParser),
            &[
                (TargetModule::Fleet, fleet.clone()),
                (TargetModule::Accounting, accounting.clone()),
            ],
        );
        let cancel = CancellationToken::new();
        let deadline = Instant::now() + Duration::from_secs(5);

        // Act - cancel while the parser is still in flight
        let command =
            orchestrator.process_command_with_deadline("Filled up gas, $45", None, deadline, &cancel);
        let result = tokio::join!(command, async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        })
        .0;

        // Assert
        assert!(matches!(result, Err(CommandError::Cancelled)));
        assert_eq!(fleet.call_count(), 0, "No handler may run after cancellation");
        assert_eq!(accounting.call_count(), 0);
    }

    #[tokio::test]
    async fn test_pre_cancelled_commands_are_rejected_immediately() {
        // Arrange
        let parser = Arc::new(HangingParser);
        let fleet = ScriptedHandler::new(HandlerScript::Succeed);
        let orchestrator = orchestrator_with(parser, &[(TargetModule::Fleet, fleet.clone())]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        // Act
        let result = orchestrator
            .process_command_with_deadline(
                "Filled up gas, $45",
                None,
                Instant::now() + Duration::from_secs(5),
                &cancel,
            )
            .await;

        // Assert
        assert!(matches!(result, Err(CommandError::Cancelled)));
        assert_eq!(fleet.call_count(), 0);
    }
}

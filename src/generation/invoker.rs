//! Primary/fallback model invocation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{self, AuthMode};
use crate::error::{ClaudeError, GenerationError};
use crate::generation::agent::AgentDefinition;
use crate::generation::subprocess::{
    EnvOverrides, ProcessRunner, ProcessSpec, SubprocessRunner, build_args, parse_cli_response,
};

/// One generation request.
///
/// Carries no session identifier: every invocation is a fresh conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub context_block: String,
    pub primary_model: String,
    pub fallback_model: String,
    pub system_prompt: Option<String>,
    pub auth_mode: AuthMode,
}

impl GenerationRequest {
    /// Build a request from an agent definition.
    pub fn from_agent(
        context_block: String,
        agent: &AgentDefinition,
        auth_mode: AuthMode,
    ) -> Self {
        Self {
            context_block,
            primary_model: agent.primary_model.clone(),
            fallback_model: agent.fallback_model.clone(),
            system_prompt: agent.instructions.clone(),
            auth_mode,
        }
    }
}

/// Unprocessed model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    pub text: String,
    /// Model that produced `text`.
    pub model: String,
    pub used_fallback: bool,
}

/// A backend able to produce a commit message from a context block.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn invoke(&self, request: &GenerationRequest) -> Result<RawOutput, GenerationError>;
}

/// Generator backed by the Claude CLI.
pub struct ClaudeGenerator<R = SubprocessRunner> {
    runner: R,
    program: String,
    timeout: Duration,
}

impl ClaudeGenerator<SubprocessRunner> {
    /// Use the real CLI, configured from the environment.
    pub fn new() -> Self {
        Self::with_runner(SubprocessRunner, config::get_program(), config::get_timeout())
    }
}

impl Default for ClaudeGenerator<SubprocessRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ProcessRunner> ClaudeGenerator<R> {
    pub fn with_runner(runner: R, program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner,
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn spec_for(&self, request: &GenerationRequest, model: &str) -> ProcessSpec {
        ProcessSpec {
            program: self.program.clone(),
            args: build_args(model, request.system_prompt.as_deref()),
            stdin: request.context_block.clone(),
            env: EnvOverrides::for_auth(request.auth_mode),
            timeout: self.timeout,
        }
    }

    async fn attempt(&self, request: &GenerationRequest, model: &str) -> Result<String, ClaudeError> {
        info!("Generating commit message with model {}", model);
        let stdout = self.runner.run(&self.spec_for(request, model)).await?;
        parse_cli_response(&stdout)
    }
}

#[async_trait]
impl<R: ProcessRunner> Generator for ClaudeGenerator<R> {
    async fn invoke(&self, request: &GenerationRequest) -> Result<RawOutput, GenerationError> {
        let primary = request.primary_model.as_str();
        let fallback = request.fallback_model.as_str();
        debug!(
            auth_mode = %request.auth_mode,
            context_bytes = request.context_block.len(),
            "Invoking generation backend"
        );

        let primary_error = match self.attempt(request, primary).await {
            Ok(text) => {
                return Ok(RawOutput {
                    text,
                    model: primary.to_string(),
                    used_fallback: false,
                });
            }
            Err(e) if !e.is_model_failure() => {
                return Err(GenerationError::ModelFailed {
                    model: primary.to_string(),
                    source: e,
                });
            }
            Err(e) => e,
        };

        warn!(
            "Model {} failed ({}), retrying once with {}",
            primary, primary_error, fallback
        );

        match self.attempt(request, fallback).await {
            Ok(text) => Ok(RawOutput {
                text,
                model: fallback.to_string(),
                used_fallback: true,
            }),
            Err(fallback_error) => Err(GenerationError::FallbackExhausted {
                primary: primary.to_string(),
                primary_error,
                fallback: fallback.to_string(),
                fallback_error,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::API_KEY_ENV_VAR;
    use crate::generation::subprocess::{MockProcessRunner, is_session_flag};
    use mockall::Sequence;
    use mockall::predicate::always;

    fn request(auth_mode: AuthMode) -> GenerationRequest {
        GenerationRequest {
            context_block: "## Staged Files".to_string(),
            primary_model: "opus".to_string(),
            fallback_model: "haiku".to_string(),
            system_prompt: None,
            auth_mode,
        }
    }

    fn generator(runner: MockProcessRunner) -> ClaudeGenerator<MockProcessRunner> {
        ClaudeGenerator::with_runner(runner, "claude", Duration::from_secs(30))
    }

    fn model_of(spec: &ProcessSpec) -> Option<&str> {
        let pos = spec.args.iter().position(|a| a == "--model")?;
        spec.args.get(pos + 1).map(String::as_str)
    }

    #[tokio::test]
    async fn test_primary_success_runs_once() {
        let mut mock = MockProcessRunner::new();
        mock.expect_run()
            .times(1)
            .withf(|spec| model_of(spec) == Some("opus"))
            .returning(|_| Ok(r#"{"result":"feat: add parser","is_error":false}"#.to_string()));

        let output = generator(mock).invoke(&request(AuthMode::Subscription)).await.unwrap();
        assert_eq!(output.text, "feat: add parser");
        assert_eq!(output.model, "opus");
        assert!(!output.used_fallback);
    }

    #[tokio::test]
    async fn test_arguments_never_resume_a_session() {
        let mut mock = MockProcessRunner::new();
        mock.expect_run()
            .times(2)
            .withf(|spec| {
                spec.args.first().map(String::as_str) == Some("-p")
                    && !spec.args.iter().any(|a| is_session_flag(a))
            })
            .returning(|_| Err(ClaudeError::Timeout(30)));

        let mut req = request(AuthMode::Subscription);
        req.system_prompt = Some("Keep it short.".to_string());
        let result = generator(mock).invoke(&req).await;
        assert!(matches!(result, Err(GenerationError::FallbackExhausted { .. })));
    }

    #[tokio::test]
    async fn test_context_block_goes_to_stdin() {
        let mut mock = MockProcessRunner::new();
        mock.expect_run()
            .times(1)
            .withf(|spec| spec.stdin == "## Staged Files")
            .returning(|_| Ok("fix: x".to_string()));

        generator(mock).invoke(&request(AuthMode::ApiKey)).await.unwrap();
    }

    #[tokio::test]
    async fn test_subscription_mode_withholds_api_key() {
        let mut mock = MockProcessRunner::new();
        mock.expect_run()
            .times(1)
            .withf(|spec| spec.env.removes(API_KEY_ENV_VAR))
            .returning(|_| Ok("fix: x".to_string()));

        generator(mock).invoke(&request(AuthMode::Subscription)).await.unwrap();
    }

    #[tokio::test]
    async fn test_api_key_mode_passes_environment_through() {
        let mut mock = MockProcessRunner::new();
        mock.expect_run()
            .times(1)
            .withf(|spec| spec.env.removed().is_empty())
            .returning(|_| Ok("fix: x".to_string()));

        generator(mock).invoke(&request(AuthMode::ApiKey)).await.unwrap();
    }

    #[tokio::test]
    async fn test_fallback_runs_exactly_once_after_model_failure() {
        let mut seq = Sequence::new();
        let mut mock = MockProcessRunner::new();
        mock.expect_run()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|spec| model_of(spec) == Some("opus"))
            .returning(|_| {
                Err(ClaudeError::NonZeroExit {
                    code: 1,
                    stderr: "overloaded".to_string(),
                })
            });
        mock.expect_run()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|spec| model_of(spec) == Some("haiku"))
            .returning(|_| Ok("docs: update readme".to_string()));

        let output = generator(mock).invoke(&request(AuthMode::Subscription)).await.unwrap();
        assert_eq!(output.model, "haiku");
        assert!(output.used_fallback);
        assert_eq!(output.text, "docs: update readme");
    }

    #[tokio::test]
    async fn test_cli_reported_error_triggers_fallback() {
        let mut seq = Sequence::new();
        let mut mock = MockProcessRunner::new();
        mock.expect_run()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(r#"{"result":"unknown model","is_error":true}"#.to_string()));
        mock.expect_run()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("fix: y".to_string()));

        let output = generator(mock).invoke(&request(AuthMode::Subscription)).await.unwrap();
        assert!(output.used_fallback);
    }

    #[tokio::test]
    async fn test_both_models_failing_names_both() {
        let mut mock = MockProcessRunner::new();
        mock.expect_run()
            .with(always())
            .times(2)
            .returning(|_| Err(ClaudeError::EmptyOutput));

        let err = generator(mock)
            .invoke(&request(AuthMode::Subscription))
            .await
            .unwrap_err();
        match err {
            GenerationError::FallbackExhausted {
                primary, fallback, ..
            } => {
                assert_eq!(primary, "opus");
                assert_eq!(fallback, "haiku");
            }
            other => panic!("Expected FallbackExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_launch_failure_is_not_retried() {
        let mut mock = MockProcessRunner::new();
        mock.expect_run().times(1).returning(|_| {
            Err(ClaudeError::SpawnFailed(std::io::Error::from(
                std::io::ErrorKind::NotFound,
            )))
        });

        let err = generator(mock)
            .invoke(&request(AuthMode::Subscription))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::ModelFailed { ref model, source: ClaudeError::SpawnFailed(_) } if model == "opus"
        ));
    }

    #[test]
    fn test_request_from_agent() {
        let agent = AgentDefinition {
            primary_model: "opus".to_string(),
            fallback_model: "sonnet".to_string(),
            instructions: Some("Be terse.".to_string()),
        };
        let req = GenerationRequest::from_agent("ctx".to_string(), &agent, AuthMode::ApiKey);
        assert_eq!(req.primary_model, "opus");
        assert_eq!(req.fallback_model, "sonnet");
        assert_eq!(req.system_prompt.as_deref(), Some("Be terse."));
    }
}

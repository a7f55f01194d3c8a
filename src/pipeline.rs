//! End-to-end run: assemble, generate, sanitize, emit, validate.
//!
//! Every fatal step happens before anything is written, so a failed run never
//! prints a delimiter. The message block is flushed before the contract is
//! even loaded.

use std::io::Write;

use tracing::{debug, info, warn};

use crate::config::AuthMode;
use crate::context::report::read_source;
use crate::context::{ChangeContext, assemble_context, render_table};
use crate::contract::{ContractSource, ValidationReport, validate_message};
use crate::error::{ContextError, PipelineError};
use crate::generation::{AgentDefinition, GenerationRequest, Generator};
use crate::protocol::{emit_message, emit_report, strip_echoed_delimiters};
use crate::sanitize::{SanitizedMessage, Sanitizer};

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub message: SanitizedMessage,
    pub report: ValidationReport,
    pub model: String,
    pub used_fallback: bool,
}

/// One configured pipeline.
pub struct Pipeline<G> {
    generator: G,
    agent: AgentDefinition,
    auth_mode: AuthMode,
    contract: ContractSource,
}

impl<G: Generator> Pipeline<G> {
    pub fn new(
        generator: G,
        agent: AgentDefinition,
        auth_mode: AuthMode,
        contract: ContractSource,
    ) -> Self {
        Self {
            generator,
            agent,
            auth_mode,
            contract,
        }
    }

    /// Run every stage for `ctx` and write the envelope to `out`.
    pub async fn run<W: Write>(
        &self,
        ctx: &ChangeContext,
        out: &mut W,
    ) -> Result<RunOutcome, PipelineError> {
        let context_block = assemble_context(ctx)?;
        info!(
            "Assembled context: {} files, {} modules, {} bytes",
            ctx.staged_files.len(),
            ctx.affected_modules().len(),
            context_block.len()
        );

        let request = GenerationRequest::from_agent(context_block, &self.agent, self.auth_mode);
        let raw = self.generator.invoke(&request).await?;
        if raw.used_fallback {
            warn!("Commit message generated by fallback model {}", raw.model);
        }

        let sanitizer = Sanitizer::new(render_table(&ctx.staged_files));
        let message = sanitizer.sanitize(&raw)?;
        debug!("Sanitized message: {} bytes", message.as_str().len());

        emit_message(out, &message).map_err(PipelineError::Output)?;

        let report = validate_message(&self.contract, &message);
        emit_report(out, &report).map_err(PipelineError::Output)?;

        Ok(RunOutcome {
            message,
            report,
            model: raw.model,
            used_fallback: raw.used_fallback,
        })
    }
}

/// Read a message to check from a file, or stdin when `source` is `-`.
pub fn read_message(source: &str) -> Result<String, ContextError> {
    read_source(source).map_err(|e| ContextError::MessageUnreadable {
        path: source.to_string(),
        source: e,
    })
}

/// Validate an existing message and emit the same envelope as a full run.
///
/// The message is used as written; only trailing line breaks and any
/// delimiter text are dropped.
pub fn check_message<W: Write>(
    text: &str,
    contract: &ContractSource,
    out: &mut W,
) -> Result<ValidationReport, PipelineError> {
    let text = strip_echoed_delimiters(text.trim_end_matches(['\n', '\r']));
    let text = text.trim_end_matches(['\n', '\r']);
    if text.trim().is_empty() {
        return Err(ContextError::EmptyMessage.into());
    }

    let message = SanitizedMessage::verbatim(text);
    emit_message(out, &message).map_err(PipelineError::Output)?;

    let report = validate_message(contract, &message);
    emit_report(out, &report).map_err(PipelineError::Output)?;
    Ok(report)
}

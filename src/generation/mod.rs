//! Generation stage: turns an assembled context block into raw model output.

pub mod agent;
pub mod invoker;
pub mod subprocess;

pub use agent::{AgentDefinition, DEFAULT_AGENT_PATH};
pub use invoker::{ClaudeGenerator, GenerationRequest, Generator, RawOutput};
pub use subprocess::{
    EnvOverrides, ProcessRunner, ProcessSpec, SESSION_FLAGS, SubprocessRunner, build_args,
    check_claude_installed, is_session_flag, parse_cli_response,
};

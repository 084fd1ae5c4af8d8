//! The conversation loop.
//!
//! An [`Agent`] owns the message history. Each turn sends the history and
//! the capability declarations to the model, relays narration to the
//! operator, dispatches every tool use in order and feeds the correlated
//! results back. A turn that used tools is followed directly by another
//! turn; otherwise the agent waits for the next line of input.

use std::io::Write;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::dispatch::Dispatcher;
use crate::model::{Backend, Message, ModelRequest, Part, StopReason, ToolSpec};
use crate::schema::to_declarations;
use crate::tools::CapabilityHost;
use crate::{Error, Result};

/// Default bound on a single model request.
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(30);

/// Input line that ends the conversation.
pub const EXIT_COMMAND: &str = "exit";

/// What the loop does after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Tools were used; the model gets their results without waiting.
    Continue,
    /// Plain answer; wait for the operator.
    AwaitInput,
}

pub struct Agent<B, H> {
    id: Uuid,
    backend: B,
    dispatcher: Dispatcher<H>,
    declarations: Vec<ToolSpec>,
    system: Option<String>,
    history: Vec<Message>,
    turn_timeout: Duration,
}

impl<B: Backend, H: CapabilityHost> Agent<B, H> {
    /// Declarations are derived from the dispatcher's catalog once, here.
    pub fn new(backend: B, dispatcher: Dispatcher<H>) -> Self {
        let declarations = to_declarations(dispatcher.catalog());
        Self {
            id: Uuid::new_v4(),
            backend,
            dispatcher,
            declarations,
            system: None,
            history: Vec::new(),
            turn_timeout: DEFAULT_TURN_TIMEOUT,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = timeout;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn catalog(&self) -> &Catalog {
        self.dispatcher.catalog()
    }

    pub fn declarations(&self) -> &[ToolSpec] {
        &self.declarations
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Queue a user message for the next turn.
    ///
    /// With history already present, [`Agent::run`] starts with a model turn
    /// instead of prompting.
    pub fn push_user_text(&mut self, text: impl Into<String>) {
        self.history.push(Message::user(text));
    }

    /// One model round trip plus dispatch of every tool use it requested.
    ///
    /// A model error or timeout is fatal. Capability failures are not: they
    /// reach the model as error results.
    pub async fn turn(&mut self, output: &mut impl Write) -> Result<TurnOutcome> {
        let request = ModelRequest {
            messages: &self.history,
            tools: &self.declarations,
            system: self.system.as_deref(),
        };

        let response = tokio::time::timeout(self.turn_timeout, self.backend.call(request))
            .await
            .map_err(|_| Error::ModelTimeout(self.turn_timeout))??;

        debug!(
            agent = %self.id,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = ?response.stop_reason,
            "model responded"
        );
        if response.stop_reason == StopReason::MaxTokens {
            warn!(agent = %self.id, "model reply truncated at max tokens");
        }

        let message = response.message;
        let mut results = Vec::new();
        for part in &message.parts {
            match part {
                Part::Text(text) => writeln!(output, "{text}")?,
                Part::ToolUse(call) => {
                    writeln!(output, "tool use: {} {}", call.name, call.input)?;
                    let outcome = self.dispatcher.invoke(&call.name, &call.input).await;
                    if !outcome.success {
                        writeln!(output, "tool error: {}", outcome.payload)?;
                    }
                    results.push(outcome.into_tool_result(&call.id));
                }
                Part::ToolResult(_) => {
                    warn!(agent = %self.id, "ignoring tool result in model reply");
                }
            }
        }
        output.flush()?;

        if !message.parts.is_empty() {
            self.history.push(message);
        }

        if results.is_empty() {
            return Ok(TurnOutcome::AwaitInput);
        }
        info!(agent = %self.id, results = results.len(), "returning tool results");
        self.history.push(Message::tool_results(results));
        Ok(TurnOutcome::Continue)
    }

    /// Drive the conversation until `exit`, end of input, `interrupt`, or a
    /// fatal error.
    ///
    /// The host is closed exactly once on every one of those paths.
    pub async fn run<R, W>(
        mut self,
        input: R,
        mut output: W,
        interrupt: impl Future<Output = ()>,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        info!(
            agent = %self.id,
            capabilities = self.declarations.len(),
            "conversation started"
        );

        let result = tokio::select! {
            result = self.converse(input, &mut output) => result,
            () = interrupt => {
                info!(agent = %self.id, "conversation interrupted");
                Ok(())
            }
        };

        if let Err(e) = &result {
            error!(agent = %self.id, "conversation failed: {e}");
        }
        self.dispatcher.host().close().await;
        info!(agent = %self.id, messages = self.history.len(), "conversation ended");
        result
    }

    async fn converse<R, W>(&mut self, input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        let mut await_input = self.history.is_empty();

        loop {
            if await_input {
                let Some(line) = read_prompt(&mut lines, output).await? else {
                    return Ok(());
                };
                self.history.push(Message::user(line));
            }
            await_input = self.turn(output).await? == TurnOutcome::AwaitInput;
        }
    }
}

/// Prompt until a non-blank line arrives. `None` on `exit` or end of input.
async fn read_prompt<R, W>(lines: &mut Lines<R>, output: &mut W) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        write!(output, "> ")?;
        output.flush()?;

        let Some(line) = lines.next_line().await? else {
            info!("end of input");
            return Ok(None);
        };
        let line = line.trim();
        if line == EXIT_COMMAND {
            return Ok(None);
        }
        if !line.is_empty() {
            return Ok(Some(line.to_string()));
        }
    }
}

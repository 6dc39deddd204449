//! Step-by-step explanations of an expression, produced by a language model.
//!
//! The calculator itself never waits on an explanation. A request snapshots the
//! expression, flips [`ExplanationState`] into loading, and whatever comes back
//! is applied only if no newer request has started since.

use tracing::{debug, warn};

use crate::ExplainError;

/// Text shown in place of an explanation when the request fails.
pub const FAILED_EXPLANATION: &str = "Failed to get explanation.";

/// Renders the prompt sent to the model for `expression`.
pub fn build_prompt(expression: &str) -> String {
    format!(
        "You are an expert mathematician skilled at explaining complex mathematical \
         expressions in a step-by-step manner.\n\n\
         Please provide a detailed, step-by-step explanation of how to solve the \
         following mathematical expression:\n\n\
         Expression: {}\n\n\
         Ensure that each step is clearly articulated and easy to understand, even for \
         someone with limited mathematical knowledge.",
        expression
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub explanation: String,
}

/// Backend that turns an expression into an explanation.
///
/// One call is one outbound request: no retries, no timeout beyond what the
/// transport itself does.
#[allow(async_fn_in_trait)]
pub trait Explainer {
    async fn explain(&self, expression: &str) -> Result<Explanation, ExplainError>;
}

/// Identifies one request so a late answer to an older one can be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Default)]
pub struct ExplanationState {
    expression: String,
    loading: bool,
    text: Option<String>,
    visible: bool,
    generation: u64,
}

impl ExplanationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a request for `expression`; the previous one, if still in
    /// flight, becomes stale.
    pub fn begin(&mut self, expression: &str) -> Result<Ticket, ExplainError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(ExplainError::EmptyExpression);
        }
        self.generation += 1;
        self.expression = expression.to_string();
        self.loading = true;
        self.text = None;
        self.visible = true;
        debug!(generation = self.generation, expression, "explanation requested");
        Ok(Ticket(self.generation))
    }

    /// Applies the outcome of the request behind `ticket`.
    ///
    /// Returns false (and changes nothing) when the ticket is stale or the
    /// presentation was dismissed in the meantime.
    pub fn resolve(
        &mut self,
        ticket: Ticket,
        outcome: Result<Explanation, ExplainError>,
    ) -> bool {
        if ticket.0 != self.generation || !self.loading {
            debug!(ticket = ticket.0, current = self.generation, "dropping stale explanation");
            return false;
        }
        self.loading = false;
        self.text = Some(match outcome {
            Ok(explanation) => explanation.explanation,
            Err(e) => {
                warn!(error = %e, "explanation request failed");
                FAILED_EXPLANATION.to_string()
            }
        });
        true
    }

    /// Hides the presentation and forgets the result.
    pub fn dismiss(&mut self) {
        self.expression.clear();
        self.loading = false;
        self.text = None;
        self.visible = false;
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

/// Runs one request end to end: begin, call the backend, resolve.
///
/// The backend's error is returned to the caller for notification even though
/// the state already shows [`FAILED_EXPLANATION`].
pub async fn request<E: Explainer>(
    explainer: &E,
    state: &mut ExplanationState,
    expression: &str,
) -> Result<(), ExplainError> {
    let ticket = state.begin(expression)?;
    let snapshot = state.expression().to_string();
    let outcome = explainer.explain(&snapshot).await;
    let failure = outcome.as_ref().err().cloned();
    state.resolve(ticket, outcome);
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(feature = "llm")]
pub use self::llm_backend::LlmExplainer;

#[cfg(feature = "llm")]
mod llm_backend {
    use llm::LLMProvider;
    use llm::builder::{LLMBackend, LLMBuilder};
    use llm::chat::{ChatMessage, ChatProvider, ChatResponse};

    use super::{Explainer, Explanation, build_prompt};
    use crate::ExplainError;

    /// Chat-completion backed explainer.
    pub struct LlmExplainer {
        provider: Box<dyn LLMProvider>,
    }

    impl LlmExplainer {
        /// `backend` is a provider name understood by `llm` (`openai`,
        /// `anthropic`, `google`, `ollama`, ...).
        pub fn new(backend: &str, model: &str, api_key: &str) -> Result<Self, ExplainError> {
            let backend: LLMBackend = backend
                .parse()
                .map_err(|e| ExplainError::Backend(format!("{}", e)))?;
            let provider = LLMBuilder::new()
                .backend(backend)
                .api_key(api_key)
                .model(model)
                .build()
                .map_err(|e| ExplainError::Backend(e.to_string()))?;
            Ok(Self { provider })
        }
    }

    impl Explainer for LlmExplainer {
        async fn explain(&self, expression: &str) -> Result<Explanation, ExplainError> {
            let messages = vec![ChatMessage::user().content(build_prompt(expression)).build()];
            let response = self
                .provider
                .chat(&messages)
                .await
                .map_err(|e| ExplainError::Backend(e.to_string()))?;
            match response.text() {
                Some(text) if !text.trim().is_empty() => Ok(Explanation { explanation: text }),
                _ => Err(ExplainError::EmptyResponse),
            }
        }
    }
}

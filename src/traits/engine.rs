use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::TransformOptions;

/// A source-code transformation engine.
///
/// The bridge treats the engine as an opaque collaborator: given source text
/// and a set of options it either produces transformed text or a list of
/// diagnostics explaining why the input was rejected. Implementations must be
/// pure with respect to their inputs — the dispatch layer may run any number
/// of calls concurrently against the same instance.
#[async_trait]
pub trait TransformEngine: Send + Sync {
    async fn transform(
        &self,
        source: &str,
        options: &TransformOptions,
    ) -> Result<String, EngineDiagnostics>;

    fn name(&self) -> &'static str;
}

/// A single engine diagnostic with a 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Diagnostic {
    pub fn new(text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            text: text.into(),
            line,
            column,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.text)
    }
}

/// The full set of diagnostics produced by a rejected transform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineDiagnostics {
    pub messages: Vec<Diagnostic>,
}

impl EngineDiagnostics {
    pub fn single(text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            messages: vec![Diagnostic::new(text, line, column)],
        }
    }

    /// Diagnostics for a transform task that panicked instead of returning.
    ///
    /// Position 0:0 marks a failure that is not attributable to the source.
    pub fn from_panic(detail: &str) -> Self {
        Self::single(format!("transform task panicked: {detail}"), 0, 0)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Display for EngineDiagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, message) in self.messages.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{message}")?;
        }
        Ok(())
    }
}

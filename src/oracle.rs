//! Protocol with the external validity/entailment solver.
//!
//! The search never evaluates formulas itself. It sends [`OracleRequest`]s
//! carrying the vocabulary and example structures to an [`Oracle`] and reads
//! back [`OracleResponse`]s. Everything on the wire is JSON.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::formula::Formula;
use crate::trace::{debug, trace};

/// A declared type as seen by the solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub builtin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateDescriptor {
    pub name: String,
    pub arg_types: Vec<String>,
    #[serde(default)]
    pub symmetric: bool,
    #[serde(default)]
    pub calculated: bool,
}

/// Types in declaration order (parents first), then predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyDescriptor {
    pub types: Vec<TypeDescriptor>,
    pub predicates: Vec<PredicateDescriptor>,
}

/// A ground atom of an example structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub predicate: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// One finite model the learned clauses must hold in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleStructure {
    pub name: String,
    pub objects: Vec<ObjectDescriptor>,
    pub facts: Vec<Fact>,
}

/// Everything a solver needs besides the formulas themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleContext {
    pub vocabulary: VocabularyDescriptor,
    pub examples: Vec<ExampleStructure>,
}

/// Request sent to a solver process.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OracleRequest<'a> {
    /// Is each formula valid on every example?
    Validity {
        vocabulary: &'a VocabularyDescriptor,
        examples: &'a [ExampleStructure],
        formulas: &'a [Formula],
    },
    /// Do the premises jointly entail the conclusion?
    Entailment {
        vocabulary: &'a VocabularyDescriptor,
        examples: &'a [ExampleStructure],
        premises: &'a [Formula],
        conclusion: &'a Formula,
    },
}

/// Reply read back from a solver process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum OracleResponse {
    Validity(Vec<bool>),
    Entailment(bool),
    Error(String),
}

/// The validity/entailment solver.
///
/// Implementations must be callable from several worker threads at once.
pub trait Oracle: Send + Sync {
    /// One answer per formula, in order.
    fn validity(
        &self,
        context: &OracleContext,
        formulas: &[Formula],
    ) -> Result<Vec<bool>, OracleError>;

    fn entails(
        &self,
        context: &OracleContext,
        premises: &[Formula],
        conclusion: &Formula,
    ) -> Result<bool, OracleError>;
}

/// An oracle bound to the context of one run.
///
/// Cheap to clone; calculators hand copies to their worker threads.
#[derive(Clone)]
pub struct OracleClient {
    oracle: Arc<dyn Oracle>,
    context: Arc<OracleContext>,
}

impl OracleClient {
    pub fn new(oracle: Arc<dyn Oracle>, context: OracleContext) -> Self {
        Self {
            oracle,
            context: Arc::new(context),
        }
    }

    pub fn context(&self) -> &OracleContext {
        &self.context
    }

    /// Validity of each formula; checks that one answer came back per formula.
    pub fn validity(&self, formulas: &[Formula]) -> Result<Vec<bool>, OracleError> {
        let answers = self.oracle.validity(&self.context, formulas)?;
        if answers.len() != formulas.len() {
            return Err(OracleError::ResponseShape {
                expected: formulas.len(),
                got: answers.len(),
            });
        }
        Ok(answers)
    }

    pub fn entails(&self, premises: &[Formula], conclusion: &Formula) -> Result<bool, OracleError> {
        self.oracle.entails(&self.context, premises, conclusion)
    }
}

impl std::fmt::Debug for OracleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleClient")
            .field("examples", &self.context.examples.len())
            .finish()
    }
}

/// Runs an external solver once per request.
///
/// The request is written to the child's stdin as one JSON document and the
/// child must print one [`OracleResponse`] on stdout and exit successfully.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
}

impl CommandOracle {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn call(&self, request: &OracleRequest<'_>) -> Result<OracleResponse, OracleError> {
        let payload = serde_json::to_vec(request)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| OracleError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(write_error) = stdin.write_all(&payload) {
                drop(stdin);
                // the solver may already have exited; reap it either way
                let _ = child.kill();
                let output = child.wait_with_output()?;
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(OracleError::Solver(format!(
                    "`{}` did not read its request ({write_error}), exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                )));
            }
        }
        let output = child.wait_with_output()?;
        trace!(
            program = %self.program,
            bytes = output.stdout.len(),
            "oracle process finished"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OracleError::Solver(format!(
                "`{}` exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        let response: OracleResponse = serde_json::from_slice(&output.stdout)?;
        if let OracleResponse::Error(message) = response {
            return Err(OracleError::Solver(message));
        }
        Ok(response)
    }
}

impl Oracle for CommandOracle {
    fn validity(
        &self,
        context: &OracleContext,
        formulas: &[Formula],
    ) -> Result<Vec<bool>, OracleError> {
        debug!(formulas = formulas.len(), "validity request");
        let request = OracleRequest::Validity {
            vocabulary: &context.vocabulary,
            examples: &context.examples,
            formulas,
        };
        match self.call(&request)? {
            OracleResponse::Validity(answers) => Ok(answers),
            _ => Err(OracleError::UnexpectedResponse {
                expected: "validity",
            }),
        }
    }

    fn entails(
        &self,
        context: &OracleContext,
        premises: &[Formula],
        conclusion: &Formula,
    ) -> Result<bool, OracleError> {
        debug!(premises = premises.len(), "entailment request");
        let request = OracleRequest::Entailment {
            vocabulary: &context.vocabulary,
            examples: &context.examples,
            premises,
            conclusion,
        };
        match self.call(&request)? {
            OracleResponse::Entailment(answer) => Ok(answer),
            _ => Err(OracleError::UnexpectedResponse {
                expected: "entailment",
            }),
        }
    }
}

#[cfg(test)]
#[path = "tests/oracle.rs"]
mod tests;

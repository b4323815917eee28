//! Typed failure taxonomy for the engine.
//!
//! Every failure carries the name of the offending resource, table, or
//! generator. Nothing is downgraded to a warning: the first error aborts the
//! enclosing transfer or scheduling run, and whether a failed run is retried
//! is a caller-level decision.

use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TabflowError>;

/// All errors the engine can raise.
#[derive(Debug, thiserror::Error)]
pub enum TabflowError {
    /// The dependency relation over the registered nodes is not acyclic.
    ///
    /// Raised by graph construction and by the table loader when a recursive
    /// population re-enters a table already being populated. No partial
    /// ordering is produced.
    #[error("a dependency cycle was detected at the node ({node}); no ordering can be produced")]
    CycleDetected { node: String },

    /// A value does not fit the declared type of its column.
    #[error("the value ({value}) does not fit the type ({expected}) of the column ({column}) in the resource ({resource})")]
    SchemaMismatch {
        resource: String,
        column: String,
        expected: String,
        value: String,
    },

    /// No generator matches a target and the target declares no columns of
    /// its own, so a dummy generator cannot be synthesized either.
    #[error("{}", unresolved_generator_message(.target, .known))]
    UnresolvedGenerator {
        target: String,
        /// The generators that were resolved (as non-matching alternatives).
        known: Vec<String>,
    },

    /// The accepted fill targets span more than one connection.
    #[error("the fill targets span more than one connection ({}); filling across connections is not supported", .connections.join(", "))]
    MultiConnectionFill { connections: Vec<String> },

    /// An underlying read or write failed. Recorded on the stream listener
    /// before being re-raised.
    #[error("read/write failure on the resource ({resource}): {source}")]
    Stream {
        resource: String,
        #[source]
        source: anyhow::Error,
    },

    /// A resource kind does not implement the requested capability.
    #[error("the resource ({resource}) does not support {operation}")]
    Unsupported { resource: String, operation: String },

    /// A foreign-key parent holds no rows and parent loading is disabled.
    #[error("the table ({child}) has a foreign key to the parent table ({parent}); that table has no rows and the option to load parents is disabled, so no rows can be generated in ({child})")]
    UnloadableParent { child: String, parent: String },

    /// A strict selector matched nothing.
    #[error("the selector ({selector}) did not match any resource")]
    EmptySelection { selector: String },
}

impl TabflowError {
    /// Shorthand for a [`TabflowError::Stream`] with a plain message.
    pub fn stream(resource: impl Into<String>, message: impl fmt::Display) -> Self {
        TabflowError::Stream {
            resource: resource.into(),
            source: anyhow::anyhow!("{message}"),
        }
    }

    /// Shorthand for a [`TabflowError::Unsupported`].
    pub fn unsupported(resource: impl Into<String>, operation: impl Into<String>) -> Self {
        TabflowError::Unsupported {
            resource: resource.into(),
            operation: operation.into(),
        }
    }
}

fn unresolved_generator_message(target: &str, known: &[String]) -> String {
    if known.is_empty() {
        format!(
            "no generator was resolved for the target ({target}) and it declares no columns; \
             supply one or more generator selectors"
        )
    } else {
        format!(
            "no generator matches the target ({target}) and it declares no columns; \
             the resolved generators are: {}",
            known.join(", ")
        )
    }
}

//! Error types

use thiserror::Error;

use crate::member::Category;

/// Errors raised while turning a module into a descriptor
#[derive(Debug, Error)]
pub enum SynthError {
    /// A composition field is already taken on the host module
    #[error("there is already a field named `{field}` on module `{host}`")]
    DuplicateField { field: String, host: &'static str },

    /// Two named members produced the same key in one category
    #[error("{category} key `{key}` is generated more than once")]
    DuplicateKey { category: Category, key: String },

    /// Two keys produced the same constant
    #[error("constant `{constant}` would map to both `{existing}` and `{incoming}`")]
    DuplicateConstant {
        constant: String,
        existing: String,
        incoming: String,
    },
}

/// Errors raised by the store and module facades
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("module `{0}` is already registered")]
    ModuleExists(String),

    #[error("{category} `{key}` is already registered by module `{owner}`")]
    KeyTaken {
        category: Category,
        key: String,
        owner: String,
    },

    #[error("unknown mutation type: {0}")]
    UnknownMutation(String),

    #[error("unknown action type: {0}")]
    UnknownAction(String),

    /// A convenience call named a member the module does not have
    #[error("module `{namespace}` has no {category} member `{member}`")]
    UnknownMember {
        category: Category,
        member: String,
        namespace: String,
    },

    #[error(transparent)]
    Synth(#[from] SynthError),

    /// Failure returned by an action body, passed through untouched
    #[error(transparent)]
    Action(anyhow::Error),
}

impl StoreError {
    /// The action body's error, if this is one
    pub fn action_error(&self) -> Option<&anyhow::Error> {
        match self {
            StoreError::Action(e) => Some(e),
            _ => None,
        }
    }
}

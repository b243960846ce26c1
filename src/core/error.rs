// This module defines the recoverable failures of the replacements core using thiserror.
// BuildError covers every way a graph build can fail without it being the caller's fault: the
// reference definition has no executable body, the body provider could not parse it, a plugin
// declined to produce a lowering, or the exception edges it raised cannot be unified into one
// exceptional exit. A BuildError never leaves a partial graph or cache entry behind; callers
// treat it as "use the generic lowering". Structural misuse of the assembler, region stack or
// template arguments is not represented here: those are programming errors and panic at the
// point of violation.

//! Error types for graph builds.

use super::definition::DefinitionId;
use thiserror::Error;

/// Recoverable failure of a graph build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("{definition} has no executable body")]
    NoBody { definition: DefinitionId },

    #[error("parsing {definition} failed: {reason}")]
    Parse {
        definition: DefinitionId,
        reason: String,
    },

    #[error("plugin for {definition} declined to produce a graph")]
    PluginDeclined { definition: DefinitionId },

    #[error("unsupported exception edge shape in {definition}: {reason}")]
    UnsupportedExceptionShape {
        definition: DefinitionId,
        reason: String,
    },
}

impl BuildError {
    pub fn definition(&self) -> &DefinitionId {
        match self {
            BuildError::NoBody { definition }
            | BuildError::Parse { definition, .. }
            | BuildError::PluginDeclined { definition }
            | BuildError::UnsupportedExceptionShape { definition, .. } => definition,
        }
    }
}

/// Result type alias for graph builds.
pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_definition() {
        let def = DefinitionId::new("Str", "hash", "()I");
        let err = BuildError::Parse {
            definition: def.clone(),
            reason: "unexpected opcode".into(),
        };
        assert_eq!(err.to_string(), "parsing Str.hash()I failed: unexpected opcode");
        assert_eq!(err.definition(), &def);
    }
}

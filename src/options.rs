use crate::ast::ArgumentName;

/// Argument names that identify an object outright rather than filter it.
pub const DEFAULT_IDENTITY_ARGUMENTS: &[&str] = &["id", "name", "key", "slug", "code"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Apply the demand/magic-sets rewrite.
    pub apply_demand: bool,
    pub identity_arguments: Vec<ArgumentName>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            apply_demand: false,
            identity_arguments: DEFAULT_IDENTITY_ARGUMENTS
                .iter()
                .map(|&name| name.to_owned())
                .collect(),
        }
    }
}

impl CompileOptions {
    pub fn with_demand(apply_demand: bool) -> Self {
        Self {
            apply_demand,
            ..Self::default()
        }
    }

    pub fn is_identity(&self, argument: &str) -> bool {
        self.identity_arguments.iter().any(|name| name == argument)
    }
}

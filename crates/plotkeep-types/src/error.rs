//! Error types for the value-type layer.

/// Errors produced while constructing Plotkeep value types.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// A permission key was empty or contained whitespace.
    ///
    /// Permission nodes look like `plots.admin.build`; a key with spaces
    /// would never match anything the host's permission system knows.
    #[error("invalid permission key: {0:?}")]
    InvalidPermissionKey(String),
}

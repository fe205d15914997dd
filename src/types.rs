pub mod missing;

// Re-export types for convenience.
pub use crate::types::missing::Missing;

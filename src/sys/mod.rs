// 🛡️ Zero-Trust Architecture: one module per concern, contracts in traits.rs.

pub mod traits;      // Global contracts
pub mod secrets;     // Memory hygiene (AccessToken)
pub mod target;      // URL validation & provider classification
pub mod credentials; // Ephemeral credential artifacts
pub mod destination; // Clone target directories
pub mod git;         // Source control
pub mod translate;   // Outcome -> error taxonomy

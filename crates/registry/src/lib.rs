pub mod errors;
pub mod registry;

pub use errors::ExtractError;
pub use registry::IdentityRegistry;

#![doc = include_str!("../README.md")]

pub mod claims;
pub mod downstream;
pub mod error;
pub mod middleware;
pub mod pkce;
pub mod provider;
pub mod verify;

// Re-exports for convenient access
pub use claims::{PublicProfile, Subject, UserClaims};
pub use downstream::{DownstreamClaims, DownstreamSigner};
pub use error::Error;
pub use pkce::{LoginSecrets, generate};
pub use provider::{ProviderClient, ProviderMetadata, TokenResponse, discover};
pub use verify::IdTokenVerifier;

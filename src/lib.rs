//! Go RPC client generator.
//!
//! - The loader reads a Go package and its declaration graph through the
//!   `go-syntax` front end.
//! - The server type's pointer method set is filtered to the API methods whose
//!   signatures fit the calling convention.
//! - The emitter writes a client type forwarding each method over the transport.

pub mod code_writer;
pub mod config;
pub mod emit;
pub mod error;
pub mod filter;
pub mod generate;
pub mod loader;
pub mod logger;
pub mod methodset;
pub mod qualifier;
pub mod signature;
pub mod types;

pub use config::{Args, GenConfig, GoEnv};
pub use error::{GenError, LoadError, Result, SignatureError};
pub use generate::{generate, generate_to_dir, write_output, GenRequest, Generated};

//! # Subreg SDK for Rust
//!
//! A Rust SDK for the subreg.cz domain registrar SOAP API: session login,
//! domain availability and info, DNS zone/record management, credit and
//! account queries.
//!
//! ## Quick Start
//!
//! ```no_run
//! use subreg_sdk_rs::{SubregClient, SubregEnvironment};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Log in against the production endpoint
//!     let mut client =
//!         SubregClient::with_credentials(SubregEnvironment::Production, "user", "secret").await?;
//!
//!     // Check availability
//!     if client.check_domain_available("example.cz").await? {
//!         println!("example.cz is available");
//!     }
//!
//!     // List the DNS zone
//!     for record in client.get_dns_zone("mydomain.cz").await? {
//!         println!("{:?} {} -> {}", record.id, record.record_type, record.content);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod parser;
pub mod transport;

// Re-exports
pub use client::SubregClient;
pub use error::{SubregError, SubregResult};
pub use models::{Autorenew, Contact, DnsRecord, SubregEnvironment};
pub use parser::{SoapNode, normalize};
pub use transport::{HttpTransport, Transport};

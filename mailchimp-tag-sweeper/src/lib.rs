//! Archives the members of a Mailchimp tag who received a campaign but never
//! clicked its confirmation link.
//!
//! ## Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use mailchimp_tag_sweeper::{sweep, Client, Credentials, LineConfirm, RunMode, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Credentials::from_api_key(std::env::var("MAILCHIMP_API_KEY").ok(), None)?;
//!     let client = Client::from_credentials(&credentials)?;
//!     let settings = Settings::new(
//!         NaiveDate::from_ymd_opt(2020, 3, 25).unwrap(),
//!         "Inaktive Abonnenten Entfernen",
//!         "Inactive",
//!         "createrawvision.de/newsletter-abo-bestaetigt",
//!     );
//!
//!     let report = sweep::run(&client, &settings, RunMode::default(), &mut LineConfirm::stdio()).await?;
//!     if let Some(batch_id) = report.outcome.batch_id() {
//!         println!("Archiving members by batch operation with ID {}", batch_id);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod prompt;
pub mod sweep;

pub use client::Client;
pub use config::{Credentials, RunMode, Settings, TagPolicy, UrlMatch};
pub use error::Error;
pub use prompt::{Confirm, LineConfirm};
pub use sweep::{ArchiveOutcome, MemberSet, SweepReport};

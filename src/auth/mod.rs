//! API key management for the DANDI archive
//!
//! # Examples
//!
//! ```rust,no_run
//! use dandi_manifest::app::ClientConfig;
//! use dandi_manifest::auth::{check_api_key, verify_api_key};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! if check_api_key() {
//!     let api_url = Url::parse("https://girder.dandiarchive.org/api/v1/")?;
//!     let valid = verify_api_key(&api_url, &ClientConfig::default()).await?;
//!     println!("key valid: {}", valid);
//! }
//! # Ok(())
//! # }
//! ```

pub mod credentials;

pub use credentials::{
    check_api_key, get_auth_status, prompt_api_key, save_api_key, setup_api_key,
    show_auth_status, verify_api_key, AuthStatus,
};

//! API key management for archive authentication
//!
//! The key is read from `DANDI_API_KEY`. `auth setup` stores it in a `.env`
//! file in the current directory with owner-only permissions.

use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use url::Url;

use crate::app::client::{ClientConfig, GirderClient};
use crate::constants::{auth, env as env_constants};
use crate::errors::{AuthError, AuthResult};

/// Authentication status information
#[derive(Debug, Clone)]
pub struct AuthStatus {
    /// Whether the API key environment variable is set
    pub api_key_set: bool,
    /// Whether .env file exists in current directory
    pub dotenv_file_exists: bool,
    /// Whether the key has been verified (None = not tested)
    pub key_valid: Option<bool>,
}

impl AuthStatus {
    /// Get descriptive status message for display
    pub fn status_message(&self) -> String {
        match (self.api_key_set, self.key_valid) {
            (false, _) => "Missing API key - run 'auth setup' to configure".to_string(),
            (true, None) => "API key configured but not verified".to_string(),
            (true, Some(true)) => "API key configured and verified".to_string(),
            (true, Some(false)) => "API key configured but invalid".to_string(),
        }
    }
}

/// Check current authentication status
pub fn get_auth_status() -> AuthStatus {
    AuthStatus {
        api_key_set: check_api_key(),
        dotenv_file_exists: Path::new(".env").exists(),
        key_valid: None,
    }
}

/// Check if a non-empty API key exists in the environment
pub fn check_api_key() -> bool {
    env::var(env_constants::API_KEY)
        .map(|key| !key.trim().is_empty())
        .unwrap_or(false)
}

/// Validate API key shape before sending it anywhere
fn validate_api_key(key: &str) -> AuthResult<()> {
    if key.len() < auth::MIN_API_KEY_LENGTH || key.len() > auth::MAX_API_KEY_LENGTH {
        return Err(AuthError::InvalidApiKey {
            reason: format!(
                "Key length must be between {} and {} characters",
                auth::MIN_API_KEY_LENGTH,
                auth::MAX_API_KEY_LENGTH
            ),
        });
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AuthError::InvalidApiKey {
            reason: "Key should contain only letters, digits, '-' or '_'".to_string(),
        });
    }

    Ok(())
}

/// Prompt for the API key without echoing it
pub fn prompt_api_key() -> AuthResult<String> {
    let key = rpassword::prompt_password("DANDI API key: ")
        .map_err(AuthError::CredentialStorage)?
        .trim()
        .to_string();

    if key.is_empty() {
        return Err(AuthError::InvalidApiKey {
            reason: "API key cannot be empty".to_string(),
        });
    }
    validate_api_key(&key)?;

    Ok(key)
}

/// Save the API key to `<dir>/.env` with secure permissions
///
/// Other lines in an existing file are preserved.
pub fn save_api_key(dir: &Path, api_key: &str) -> AuthResult<()> {
    let env_path = dir.join(".env");
    let prefix = format!("{}=", env_constants::API_KEY);
    let entry = format!("{}{}", prefix, api_key);
    let mut lines = Vec::new();
    let mut key_found = false;

    if env_path.exists() {
        let reader = BufReader::new(File::open(&env_path)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().starts_with(&prefix) {
                lines.push(entry.clone());
                key_found = true;
            } else {
                lines.push(line);
            }
        }
    }

    if !key_found {
        lines.push(entry);
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(auth::ENV_FILE_PERMISSIONS);
    }
    let mut file = options.open(&env_path)?;

    // `mode` only applies on creation; tighten a pre-existing file before writing
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file.metadata()?.permissions();
        perms.set_mode(auth::ENV_FILE_PERMISSIONS);
        file.set_permissions(perms)?;
    }

    for line in lines {
        writeln!(file, "{}", line)?;
    }

    tracing::info!("Saved API key to {}", env_path.display());
    Ok(())
}

/// Verify the API key in the environment by authenticating against the archive
///
/// Returns `Ok(false)` when the archive rejects the key; transport failures
/// are returned as errors.
pub async fn verify_api_key(api_url: &Url, config: &ClientConfig) -> AuthResult<bool> {
    if !check_api_key() {
        return Err(AuthError::MissingApiKey);
    }

    match GirderClient::from_env(api_url.clone(), config).await {
        Ok(_) => Ok(true),
        Err(AuthError::Rejected { status }) => {
            tracing::warn!("API key rejected (HTTP {})", status);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Interactive API key setup workflow
pub async fn setup_api_key(api_url: &Url, config: &ClientConfig, force: bool) -> AuthResult<()> {
    println!("DANDI Authentication Setup");
    println!("==========================");
    println!();
    println!("Your API key will be stored in a .env file in the current directory.");
    println!();

    if check_api_key() && !force {
        print!("An API key is already configured. Replace it? [y/N]: ");
        io::stdout().flush()?;

        let mut response = String::new();
        io::stdin().read_line(&mut response)?;

        if !response.trim().to_lowercase().starts_with('y') {
            println!("Setup cancelled.");
            return Ok(());
        }
        println!();
    }

    let api_key = prompt_api_key()?;
    save_api_key(Path::new("."), &api_key)?;

    // Make the new key visible to this process
    env::set_var(env_constants::API_KEY, &api_key);

    println!("API key saved. Verifying...");
    if verify_api_key(api_url, config).await? {
        println!("Setup complete.");
    } else {
        println!("The archive rejected this key. Run 'auth setup' again to re-enter it.");
    }

    Ok(())
}

/// Show current authentication status, verifying the key if one is set
pub async fn show_auth_status(api_url: &Url, config: &ClientConfig) -> AuthResult<AuthStatus> {
    let mut status = get_auth_status();

    println!("DANDI Authentication Status");
    println!("===========================");
    println!();
    println!(
        "API key:   {}",
        if status.api_key_set { "Set" } else { "Not set" }
    );
    println!(
        ".env file: {}",
        if status.dotenv_file_exists {
            "Exists"
        } else {
            "Not found"
        }
    );
    println!("Archive:   {}", api_url);
    println!();

    if status.api_key_set {
        status.key_valid = Some(verify_api_key(api_url, config).await?);
    }

    println!("Status: {}", status.status_message());
    Ok(status)
}

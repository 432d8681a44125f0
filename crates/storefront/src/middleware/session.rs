//! Session middleware configuration.
//!
//! Sets up signed-cookie sessions using tower-sessions. The production store
//! is `PostgreSQL`; tests pass a `MemoryStore`.

use secrecy::ExposeSecret;
use tower_sessions::cookie::{Key, KeyError};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "vinoteca_session";

/// Session expiry time in seconds (7 days). The cart lives this long; the
/// checkout inside it expires on its own schedule.
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer over `store`, signing the cookie with the
/// configured session secret.
///
/// # Arguments
///
/// * `store` - Session record store
/// * `config` - Storefront configuration (for session secret)
///
/// # Errors
///
/// Returns `KeyError` if the session secret is too short to derive a key.
pub fn create_session_layer<S>(
    store: S,
    config: &StorefrontConfig,
) -> Result<SessionManagerLayer<S, SignedCookie>, KeyError>
where
    S: SessionStore + Clone,
{
    let key = Key::try_from(config.session_secret.expose_secret().as_bytes())?;

    // Determine if we're in production (HTTPS)
    let is_secure = config.base_url.starts_with("https://");

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}

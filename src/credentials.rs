use anyhow::Result;
use keyring::Entry;
use tracing::warn;

const SERVICE: &str = "vesrates";
const USERNAME: &str = "coinmarketcap";

/// Read side of the credential store. The aggregator checks this once per
/// cycle to decide whether the crypto fetch runs at all.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored API key, or `None` when unset or unreadable.
    fn api_key(&self) -> Option<String>;
}

/// API key storage backed by the operating-system keyring. The secret never
/// touches the config file or the rate store.
pub struct KeyringStore;

impl KeyringStore {
    pub fn set_api_key(&self, api_key: &str) -> Result<()> {
        let entry = Entry::new(SERVICE, USERNAME)?;
        entry.set_password(api_key)?;
        Ok(())
    }

    pub fn clear_api_key(&self) -> Result<()> {
        let entry = Entry::new(SERVICE, USERNAME)?;
        match entry.delete_password() {
            Ok(()) => Ok(()),
            // Already gone counts as cleared.
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl CredentialStore for KeyringStore {
    fn api_key(&self) -> Option<String> {
        let entry = match Entry::new(SERVICE, USERNAME) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Keyring unavailable: {e}");
                return None;
            }
        };
        match entry.get_password() {
            Ok(key) if !key.is_empty() => Some(key),
            Ok(_) => None,
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                // An unreadable keyring only means the crypto fetch is
                // skipped this cycle.
                warn!("Could not read API key from keyring: {e}");
                None
            }
        }
    }
}

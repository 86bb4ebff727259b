//! In-memory profile fetchers

use profile_harvester::{FetchError, Profile, ProfileFetcher};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// What a scripted fetch does for one identity
#[derive(Clone, Copy, Debug)]
pub enum Outcome {
    /// Return a profile
    Found,
    /// Return `NotFound`
    Missing,
    /// Return a 500
    Fail,
    /// Never answer until cancelled
    Hang,
}

/// Fetcher answering from a per-identity script, recording every call
#[derive(Default)]
pub struct ScriptedFetcher {
    script: HashMap<String, Outcome>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedFetcher {
    /// Identities not in the script are found
    pub fn new(script: &[(&str, Outcome)]) -> Self {
        Self {
            script: script.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(identity, credential)` pairs in call order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Credentials in call order
    pub fn credentials(&self) -> Vec<String> {
        self.calls().into_iter().map(|(_, c)| c).collect()
    }

    /// Identities in call order
    pub fn identities(&self) -> Vec<String> {
        self.calls().into_iter().map(|(i, _)| i).collect()
    }
}

#[async_trait::async_trait]
impl ProfileFetcher for ScriptedFetcher {
    async fn fetch_profile(
        &self,
        identity: &str,
        credential: &str,
        cancel: CancellationToken,
    ) -> Result<Profile, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((identity.to_string(), credential.to_string()));

        match self.script.get(identity).copied().unwrap_or(Outcome::Found) {
            Outcome::Found => Ok(profile(identity)),
            Outcome::Missing => Err(FetchError::NotFound {
                identity: identity.to_string(),
            }),
            Outcome::Fail => Err(FetchError::Http { status: 500 }),
            Outcome::Hang => {
                cancel.cancelled().await;
                Err(FetchError::Cancelled)
            }
        }
    }
}

/// A plausible profile for `username`
pub fn profile(username: &str) -> Profile {
    Profile {
        user_id: username.bytes().map(u64::from).sum(),
        username: username.to_string(),
        full_name: format!("{username} shop"),
        followers: 100,
        followees: 10,
        media_count: 5,
        biography: "open daily".to_string(),
        external_url: None,
        is_private: false,
        is_verified: false,
        profile_pic_url: format!("https://cdn.example/{username}.jpg"),
        business_phone_number: Some("+98 21 0000".to_string()),
        business_email: None,
        business_address: None,
    }
}

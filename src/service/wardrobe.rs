//! Wardrobe import and figure extraction.
//!
//! Outfits come from two places: the server-side wardrobe, fetched with a
//! correlated request, and figure strings found in free text such as a
//! pasted chat log.

use crate::error::{ProtocolError, Result};
use crate::game::avatar::Gender;
use crate::protocol::client::ClientType;
use crate::protocol::dispatcher::Interceptor;
use crate::protocol::messages::{GetWardrobeMsg, UpdateAvatarMsg, WardrobeMsg, WardrobeSlot};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, instrument};

/// `hr-100-61.hd-180-1.ch-210-66`: parts of set type, set id and up to two colours.
static MODERN_FIGURE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\b[a-z]{2}(-\d+){1,3}(\.[a-z]{2}(-\d+){1,3})*\b").ok()
});

/// Origins figures are 25 digits: five parts of a three digit set and two digit colour.
static ORIGINS_FIGURE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\b\d{25}\b").ok());

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Outfit {
    pub figure: String,
    pub gender: Gender,
    pub is_origins: bool,
}

impl Outfit {
    pub fn new(figure: impl Into<String>, gender: Gender, is_origins: bool) -> Self {
        Self {
            figure: figure.into(),
            gender,
            is_origins,
        }
    }

    /// Origins figures only work on Origins, modern figures only on Flash and Unity.
    pub fn is_compatible(&self, client: ClientType) -> bool {
        self.is_origins == client.is_origins()
    }
}

impl From<WardrobeSlot> for Outfit {
    fn from(slot: WardrobeSlot) -> Self {
        Outfit::new(slot.figure, slot.gender, false)
    }
}

/// Find every figure string for `client` in `text`, in order of first appearance.
pub fn extract_figures(text: &str, client: ClientType) -> Vec<String> {
    let pattern = if client.is_origins() {
        &*ORIGINS_FIGURE
    } else {
        &*MODERN_FIGURE
    };
    let Some(pattern) = pattern.as_ref() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    pattern
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|figure| seen.insert(*figure))
        .map(str::to_string)
        .collect()
}

/// Outfits for every figure found in `text`, all with `gender`.
pub fn outfits_from_text(text: &str, client: ClientType, gender: Gender) -> Vec<Outfit> {
    extract_figures(text, client)
        .into_iter()
        .map(|figure| Outfit::new(figure, gender, client.is_origins()))
        .collect()
}

/// Fetch the server-side wardrobe. Only Flash and Unity have one.
#[instrument(skip(interceptor))]
pub async fn import_wardrobe(interceptor: &Interceptor, timeout: Duration) -> Result<Vec<Outfit>> {
    let client = interceptor.client().ok_or(ProtocolError::ConnectionClosed)?;
    if !client.is_modern() {
        return Err(ProtocolError::UnsupportedVariant {
            message: "WardrobeMsg",
            client,
        });
    }

    let wardrobe: WardrobeMsg = interceptor.request(&GetWardrobeMsg, timeout).await?;
    debug!(slots = wardrobe.slots.len(), "Imported wardrobe");
    Ok(wardrobe.slots.into_iter().map(Outfit::from).collect())
}

/// Change the local user's figure to `outfit`.
pub fn wear_outfit(interceptor: &Interceptor, outfit: &Outfit) -> Result<()> {
    let client = interceptor.client().ok_or(ProtocolError::ConnectionClosed)?;
    if !outfit.is_compatible(client) {
        return Err(ProtocolError::UnsupportedVariant {
            message: "Outfit",
            client,
        });
    }
    interceptor.send(&UpdateAvatarMsg {
        gender: outfit.gender,
        figure: outfit.figure.clone(),
    })
}

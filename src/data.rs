use serenity::prelude::TypeMapKey;

use crate::registry::VoiceRegistry;

#[derive(Debug)]
pub struct Data {
    pub(crate) registry: VoiceRegistry,
}

/// Lets the raw serenity event handler reach the same registry the poise
/// commands use.
pub struct RegistryKey;

impl TypeMapKey for RegistryKey {
    type Value = VoiceRegistry;
}

use std::env;

use lazy_static::lazy_static;
use serenity::all::GuildId;

/// Static bot configuration, read from the environment once at first use.
/// `main` loads `.env` before anything touches this.
#[derive(Debug)]
pub struct Config {
    pub token: String,
    pub allowed_guilds: Vec<GuildId>,
    pub prefix: String,
    pub public_category: String,
    pub private_category: String,
    pub create_channel: String,
    pub random_channel: String,
}

impl Config {
    fn from_env() -> Config {
        let token = env::var("DISCORD_TOKEN").expect("Discord Bot token is required.");
        let allowed_guilds = env::var("ALLOWED_GUILDS")
            .expect("ALLOWED_GUILDS is required.")
            .split(',')
            .map(|x| x.trim())
            .filter(|x| !x.is_empty())
            .map(|x| {
                GuildId::new(
                    x.parse()
                        .expect("ALLOWED_GUILDS must be comma-separated guild ids."),
                )
            })
            .collect::<Vec<_>>();
        if allowed_guilds.is_empty() {
            panic!("ALLOWED_GUILDS must contain at least one guild id.");
        }
        Config {
            token,
            allowed_guilds,
            prefix: env::var("COMMAND_PREFIX").unwrap_or(",".to_string()),
            public_category: env::var("PUBLIC_CATEGORY").unwrap_or("Public VCs".to_string()),
            private_category: env::var("PRIVATE_CATEGORY").unwrap_or("Private VCs".to_string()),
            create_channel: env::var("CREATE_CHANNEL").unwrap_or("Join to Create".to_string()),
            random_channel: env::var("RANDOM_CHANNEL").unwrap_or("Join a Random VC".to_string()),
        }
    }

    pub fn is_guild_allowed<T: Into<GuildId>>(&self, guild: T) -> bool {
        self.allowed_guilds.contains(&guild.into())
    }
}

lazy_static! {
    static ref CONFIG: Config = Config::from_env();
}

pub fn config() -> &'static Config {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_only_admits_listed_guilds() {
        let config = Config {
            token: "token".to_string(),
            allowed_guilds: vec![GuildId::new(1), GuildId::new(2)],
            prefix: ",".to_string(),
            public_category: "Public VCs".to_string(),
            private_category: "Private VCs".to_string(),
            create_channel: "Join to Create".to_string(),
            random_channel: "Join a Random VC".to_string(),
        };
        assert!(config.is_guild_allowed(GuildId::new(1)));
        assert!(config.is_guild_allowed(GuildId::new(2)));
        assert!(!config.is_guild_allowed(GuildId::new(3)));
    }
}

pub mod guild_gate;
pub mod temp_voice;

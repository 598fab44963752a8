use serenity::all::{Colour, CreateEmbed, Timestamp};

/// Every command outcome is reported as one of these embeds, success and
/// failure alike.

pub fn success<T: Into<String>>(description: T) -> CreateEmbed {
    CreateEmbed::new()
        .title("✅ Success!")
        .description(description.into())
        .colour(Colour::DARK_GREEN)
        .timestamp(Timestamp::now())
}

pub fn failure<T: Into<String>>(description: T) -> CreateEmbed {
    CreateEmbed::new()
        .title("❌ Error!")
        .description(description.into())
        .colour(Colour::RED)
        .timestamp(Timestamp::now())
}

pub fn info<T: Into<String>, U: Into<String>>(title: T, description: U) -> CreateEmbed {
    CreateEmbed::new()
        .title(title.into())
        .description(description.into())
        .colour(Colour::BLUE)
        .timestamp(Timestamp::now())
}

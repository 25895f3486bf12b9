use crate::services::twitch::command_service::CommandContext;

pub const INTRODUCTION: &str = "NOTICE: I am Porygon Bot, a Twitch chat bot created by Joji! \
You can use commands like !lurk, !shinyroll, and !socials to interact with me! \
If you have any suggestions, feel free to let Joji know!";

pub fn handle_porygonbot(_ctx: &mut CommandContext<'_>) -> Option<String> {
    Some(INTRODUCTION.to_string())
}

pub fn handle_lurk(ctx: &mut CommandContext<'_>) -> Option<String> {
    Some(format!("LURK ACKNOWLEDGED - Thanks {}!", ctx.chatter_name()))
}

/// `!socials` or `!socials discord`.
pub fn handle_socials(ctx: &mut CommandContext<'_>) -> Option<String> {
    let wants_discord = ctx
        .args
        .first()
        .is_some_and(|sub| sub.eq_ignore_ascii_case("discord"));
    if wants_discord {
        return handle_discord(ctx);
    }
    Some(format!(
        "NOTICE: You can find all socials here: {}",
        ctx.config.socials_url
    ))
}

pub fn handle_discord(ctx: &mut CommandContext<'_>) -> Option<String> {
    Some(format!("NOTICE: Join the Discord! {}", ctx.config.discord_url))
}

use crate::services::twitch::command_service::CommandContext;

/// Full odds for a shiny.
pub const SHINY_ODDS: u32 = 8192;

pub fn handle_shinyroll(ctx: &mut CommandContext<'_>) -> Option<String> {
    let n = ctx.rng.roll(1, SHINY_ODDS);
    if n == SHINY_ODDS {
        Some(format!("RESULT: AMAZING {}! You rolled {}!!!", ctx.chatter_name(), n))
    } else {
        Some(format!("RESULT: {} rolled {}!", ctx.chatter_name(), n))
    }
}

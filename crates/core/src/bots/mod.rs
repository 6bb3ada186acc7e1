pub mod moving;

use crate::bots::moving::pricing::PricingSettings;
use crate::domain::session::MOVING_BOT_TYPE;
use crate::engine::MovingBotEngine;
use crate::errors::ApplicationError;

/// Build the engines listed in `enabled_bots`. Registration is explicit:
/// nothing loads as an import-time side effect, and an unknown bot id is a
/// configuration error, not a silent skip.
pub fn build_engine(
    enabled_bots: &[String],
    pricing: PricingSettings,
    estimate_display_enabled: bool,
) -> Result<MovingBotEngine, ApplicationError> {
    if !enabled_bots.iter().any(|bot| bot == MOVING_BOT_TYPE) {
        return Err(ApplicationError::Configuration(format!(
            "no loadable bot in enabled_bots (expected `{MOVING_BOT_TYPE}`)"
        )));
    }
    for bot in enabled_bots {
        if bot != MOVING_BOT_TYPE {
            return Err(ApplicationError::Configuration(format!("unknown bot id `{bot}`")));
        }
    }
    Ok(MovingBotEngine::new(pricing, estimate_display_enabled))
}

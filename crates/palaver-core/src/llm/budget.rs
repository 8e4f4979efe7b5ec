//! Token-budget estimation and greedy history truncation.
//!
//! Token-exact accounting would need a round trip to the provider's
//! tokenizer per message; the relay instead uses a coarse length heuristic
//! (4 characters per token for text, a flat constant per image) and lets
//! the provider's own hard limit act as the backstop.

use tracing::{debug, warn};

use palaver_types::chat::Turn;
use palaver_types::error::OversizedRequest;

/// Characters per estimated token (integer division, coarse on purpose).
pub const TEXT_CHARS_PER_TOKEN: u32 = 4;

/// Flat per-image cost, independent of resolution.
pub const IMAGE_TOKEN_COST: u32 = 256;

/// Estimated token cost of a piece of text.
///
/// Counts Unicode scalar values, not bytes, so non-ASCII chat costs the
/// same per character as ASCII.
pub fn estimate_text_tokens(text: &str) -> u32 {
    text.chars().count() as u32 / TEXT_CHARS_PER_TOKEN
}

/// Estimated token cost of one stored turn.
pub fn estimate_turn_tokens(turn: &Turn) -> u32 {
    estimate_text_tokens(&turn.text)
}

/// Estimated token cost of a whole history window.
pub fn estimate_history_tokens(turns: &[Turn]) -> u32 {
    turns.iter().map(estimate_turn_tokens).sum()
}

/// Estimated token cost of a new request (text plus attached images).
pub fn estimate_request_tokens(text: &str, image_count: usize) -> u32 {
    estimate_text_tokens(text) + image_count as u32 * IMAGE_TOKEN_COST
}

/// Largest suffix of `turns` that fits the model's budget together with a
/// new request of `request_tokens`.
///
/// Turns are kept whole or dropped whole, oldest first; no reordering.
/// If the request alone exceeds `limit` the caller gets
/// [`OversizedRequest`] -- that is a user-facing rejection, never retried.
pub fn fit_to_budget(
    mut turns: Vec<Turn>,
    request_tokens: u32,
    limit: u32,
) -> Result<Vec<Turn>, OversizedRequest> {
    if request_tokens > limit {
        warn!(
            estimated = request_tokens,
            limit, "request alone exceeds the context budget"
        );
        return Err(OversizedRequest {
            estimated: request_tokens,
            limit,
        });
    }

    let mut total = estimate_history_tokens(&turns);
    if total + request_tokens <= limit {
        return Ok(turns);
    }

    let mut cut = 0;
    while cut < turns.len() && total + request_tokens > limit {
        total -= estimate_turn_tokens(&turns[cut]);
        cut += 1;
    }
    debug!(
        dropped = cut,
        kept = turns.len() - cut,
        remaining_tokens = total,
        "truncated history to fit the context budget"
    );
    turns.drain(..cut);
    Ok(turns)
}

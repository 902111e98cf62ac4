//! Message shapes posted around a backend call.

use std::time::Duration;

use crate::pipeline::clock::format_elapsed;
use crate::surface::OutboundMessage;

use super::chunker::ResponseChunk;

/// Title of the loading indicator.
pub const LOADING_TITLE: &str = "Processing your question...";

/// "Generating an answer for ..." posted before the call.
pub fn announcement(author: &str, started: &str, model: &str) -> OutboundMessage {
    OutboundMessage::text(format!(
        "Generating an answer for **{author}** at **({started})** using **'{model}'**"
    ))
}

/// Embed shown while the backend works. Deleted once the call settles.
pub fn loading_indicator(animation_url: &str) -> OutboundMessage {
    OutboundMessage::titled(LOADING_TITLE).with_image(animation_url)
}

/// Banner posted before the answer parts.
pub fn completion_banner(elapsed: Duration) -> OutboundMessage {
    OutboundMessage::text(format!("# [{}] Dinner is served 😎", format_elapsed(elapsed)))
}

/// Wrap chunks into question/answer embeds, one message per chunk.
///
/// Part 1 repeats the question and, when more parts follow, carries a
/// `<Part 1>` marker. Later parts are titled with their number and their
/// text is prefixed with `-`.
pub fn frame_answer(
    chunks: &[ResponseChunk],
    author: &str,
    bot: &str,
    prompt: &str,
) -> Vec<OutboundMessage> {
    let multipart = chunks.len() > 1;
    chunks
        .iter()
        .map(|chunk| {
            if chunk.is_first() {
                let marker = if multipart { "\n**<Part 1>**\n" } else { "" };
                OutboundMessage::embed(
                    format!("**Answer for {author} by {bot}**"),
                    format!("Q: \"{prompt}\"\nA: {marker}{}", chunk.text),
                )
            } else {
                OutboundMessage::embed(
                    format!("**<Part {}>**", chunk.index + 1),
                    format!("-{}", chunk.text),
                )
            }
        })
        .collect()
}

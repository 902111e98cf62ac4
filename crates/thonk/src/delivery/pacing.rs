//! Raw paced delivery.

use std::time::Duration;

use crate::surface::{Channel, OutboundMessage};

use super::chunker::segments;

/// What happened to the parts of one paced delivery.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SendReport {
    /// Parts the channel accepted.
    pub sent: usize,
    /// One entry per part the channel refused, in order.
    pub failures: Vec<String>,
}

impl SendReport {
    pub fn attempted(&self) -> usize {
        self.sent + self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Post `text` as plain messages of at most `limit` chars, pausing `pacing`
/// between sends.
///
/// A refused part does not stop the rest; every part is attempted once.
pub async fn send_large(
    channel: &dyn Channel,
    text: &str,
    limit: usize,
    pacing: Duration,
) -> SendReport {
    let mut report = SendReport::default();
    for piece in segments(text, limit) {
        if report.attempted() > 0 {
            tokio::time::sleep(pacing).await;
        }
        match channel.send(OutboundMessage::text(piece)).await {
            Ok(_) => report.sent += 1,
            Err(e) => report.failures.push(e),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RecordingChannel;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn sends_raw_chunks_with_pauses_between() {
        let channel = RecordingChannel::new();
        let text = "y".repeat(4500);
        let start = Instant::now();

        let report = send_large(&channel, &text, 2000, Duration::from_secs(2)).await;

        assert_eq!(report.sent, 3);
        assert!(report.is_complete());
        assert_eq!(start.elapsed(), Duration::from_secs(4));
        let lens: Vec<usize> = channel.transcript().iter().map(|t| t.len()).collect();
        assert_eq!(lens, vec![2000, 2000, 500]);
        assert_eq!(channel.transcript().concat(), text);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_text_sends_nothing_and_never_sleeps() {
        let channel = RecordingChannel::new();
        let start = Instant::now();
        assert_eq!(
            send_large(&channel, "", 2000, Duration::from_secs(2)).await,
            SendReport::default()
        );
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(channel.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn refused_part_does_not_stop_the_rest() {
        let channel = RecordingChannel::new().failing_send(2);
        let text = format!("{}{}{}", "a".repeat(2000), "b".repeat(2000), "c".repeat(2000));
        let start = Instant::now();

        let report = send_large(&channel, &text, 2000, Duration::from_secs(2)).await;

        assert_eq!(report.sent, 2);
        assert_eq!(report.failures, vec!["send #2 refused".to_string()]);
        assert_eq!(report.attempted(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(4));
        assert_eq!(channel.transcript(), vec!["a".repeat(2000), "c".repeat(2000)]);
    }
}

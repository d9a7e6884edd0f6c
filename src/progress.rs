//! Terminal progress bar for a single package transfer.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use update_downloader::ProgressSnapshot;

const SIZED_TEMPLATE: &str =
    "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {bytes_per_sec}";
const UNSIZED_TEMPLATE: &str = "{spinner} {msg} {bytes} {bytes_per_sec}";

/// Progress display that starts as a spinner and becomes a bar once the
/// transfer's size is known.
pub(crate) struct TransferBar {
    bar: ProgressBar,
}

impl TransferBar {
    /// Creates the display. A hidden bar accepts every call and draws nothing.
    pub(crate) fn new(visible: bool, label: &str, total_bytes: Option<u64>) -> Self {
        let bar = ProgressBar::new_spinner();
        if visible {
            bar.enable_steady_tick(Duration::from_millis(100));
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        bar.set_style(unsized_style());
        bar.set_message(label.to_string());
        let transfer_bar = Self { bar };
        if let Some(total) = total_bytes {
            transfer_bar.set_total(total);
        }
        transfer_bar
    }

    pub(crate) fn update(&self, snapshot: &ProgressSnapshot) {
        if let Some(total) = snapshot.total_bytes
            && self.bar.length() != Some(total)
        {
            self.set_total(total);
        }
        self.bar.set_position(snapshot.bytes_received);
    }

    pub(crate) fn finish(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }

    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_style(sized_style());
    }
}

fn sized_style() -> ProgressStyle {
    ProgressStyle::with_template(SIZED_TEMPLATE)
        .map(|style| style.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn unsized_style() -> ProgressStyle {
    ProgressStyle::with_template(UNSIZED_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Whether to draw a bar: only on an interactive, capable terminal and
/// never in quiet mode.
pub(crate) fn should_show_bar(stderr_is_terminal: bool, quiet: bool, dumb_terminal: bool) -> bool {
    stderr_is_terminal && !quiet && !dumb_terminal
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM").is_ok_and(|term| term.eq_ignore_ascii_case("dumb"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use update_downloader::CorrelationToken;

    fn snapshot(received: u64, total: Option<u64>) -> ProgressSnapshot {
        ProgressSnapshot::new(received, total, CorrelationToken::from("bar"))
    }

    #[test]
    fn test_should_show_bar_requires_interactive_terminal() {
        assert!(should_show_bar(true, false, false));
        assert!(!should_show_bar(false, false, false));
        assert!(!should_show_bar(true, true, false));
        assert!(!should_show_bar(true, false, true));
    }

    #[test]
    fn test_bar_picks_up_total_from_first_sized_snapshot() {
        let bar = TransferBar::new(false, "app.zip", None);
        assert_eq!(bar.bar.length(), None);

        bar.update(&snapshot(512, None));
        assert_eq!(bar.bar.position(), 512);

        bar.update(&snapshot(1024, Some(4096)));
        assert_eq!(bar.bar.length(), Some(4096));
        assert_eq!(bar.bar.position(), 1024);
    }

    #[test]
    fn test_bar_uses_advertised_size_up_front() {
        let bar = TransferBar::new(false, "app.zip", Some(2048));
        assert_eq!(bar.bar.length(), Some(2048));
        bar.finish("done");
    }
}

use groupcal_core::{NoticeKind, Notifier};
use owo_colors::OwoColorize;

/// Prints notices: successes to stdout in green, errors to stderr in red.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Success => println!("{}", message.green()),
            NoticeKind::Error => eprintln!("{}", message.red()),
        }
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification sink rejected payload: {0}")]
    Rejected(String),
}

/// Delivery seam for rendered report payloads. The renderer guarantees
/// every payload respects the sink's size limit; implementations only
/// move text.
pub trait Notifier {
    fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Writes payloads to stdout, one blank line between them. Stands in
/// for a real messaging sink.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn send(&self, text: &str) -> Result<(), NotifyError> {
        println!("{text}\n");
        Ok(())
    }
}

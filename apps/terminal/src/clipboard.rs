//! Clipboard access for copying price levels.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(#[from] arboard::Error),
}

pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The system clipboard, opened on first use and kept open so X11
/// selections outlive the copy call.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.inner.is_none() {
            self.inner = Some(arboard::Clipboard::new()?);
        }
        if let Some(clipboard) = self.inner.as_mut() {
            clipboard.set_text(text)?;
        }
        Ok(())
    }
}

/// Keeps copied text in memory.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct RecordingClipboard {
    pub copied: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    pub fail: bool,
}

#[cfg(test)]
impl Clipboard for RecordingClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.fail {
            return Err(arboard::Error::ClipboardNotSupported.into());
        }
        self.copied.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_recording_clipboard_shares_history() {
        let recorder = RecordingClipboard::default();
        let mut clipboard: Box<dyn Clipboard> = Box::new(recorder.clone());
        clipboard.set_text("64000").unwrap();
        clipboard.set_text("62500").unwrap();
        assert_eq!(*recorder.copied.lock().unwrap(), vec!["64000", "62500"]);
    }

    #[test]
    fn test_unavailable_error_message() {
        let err = ClipboardError::from(arboard::Error::ClipboardNotSupported);
        assert!(err.to_string().starts_with("Clipboard unavailable"));
    }
}

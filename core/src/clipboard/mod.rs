//! Cross-platform clipboard abstraction
//!
//! The engine never talks to the OS clipboard directly; it goes through
//! [`ClipboardAccess`], which keeps the protocol exercisable without a
//! display server and the platform glue replaceable.

use arboard::Clipboard as ArboardClipboard;

use crate::{Error, Result};

/// Capability interface for reading and writing local clipboard text.
///
/// Both operations are best-effort: the OS clipboard can be unavailable at
/// any moment, independent of the protocol.
pub trait ClipboardAccess: Send {
    /// Read the current clipboard text. `None` when the clipboard is empty
    /// or holds no text.
    fn read(&mut self) -> Result<Option<String>>;

    /// Write text to the clipboard.
    fn write(&mut self, text: &str) -> Result<()>;
}

/// System clipboard backed by `arboard`.
///
/// A fresh `arboard` handle is opened per operation; holding one across
/// polls keeps the selection owned on some platforms.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl ClipboardAccess for SystemClipboard {
    fn read(&mut self) -> Result<Option<String>> {
        let mut clipboard =
            ArboardClipboard::new().map_err(|e| Error::Clipboard(e.to_string()))?;

        match clipboard.get_text() {
            Ok(text) if !text.is_empty() => Ok(Some(text)),
            Ok(_) => Ok(None),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(Error::Clipboard(e.to_string())),
        }
    }

    fn write(&mut self, text: &str) -> Result<()> {
        let mut clipboard =
            ArboardClipboard::new().map_err(|e| Error::Clipboard(e.to_string()))?;
        clipboard
            .set_text(text)
            .map_err(|e| Error::Clipboard(e.to_string()))
    }
}

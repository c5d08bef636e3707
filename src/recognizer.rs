use crate::Result;

/// Outcome of running text recognition over one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// The full recognized text block for the image.
    Text(String),

    /// The provider ran successfully but found nothing to read.
    NoText,
}

impl Recognition {
    /// Build a recognition from optional provider text, treating blank text as no text.
    pub fn from_text(text: Option<String>) -> Self {
        match text {
            Some(text) if !text.trim().is_empty() => Self::Text(text),
            _ => Self::NoText,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::NoText => None,
        }
    }
}

/// Pluggable OCR provider used by [`crate::Rollcall`].
///
/// A recognizer turns raw image bytes into the primary recognized text block. Calls are
/// synchronous with no retry; failures go straight back to the caller.
///
/// Implementations should report provider-side failures as [`crate::Error::Provider`] so
/// the batch driver can skip that image and keep going.
pub trait TextRecognizer {
    fn recognize(&self, image: &[u8]) -> Result<Recognition>;
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for &T {
    fn recognize(&self, image: &[u8]) -> Result<Recognition> {
        (**self).recognize(image)
    }
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for Box<T> {
    fn recognize(&self, image: &[u8]) -> Result<Recognition> {
        (**self).recognize(image)
    }
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for std::sync::Arc<T> {
    fn recognize(&self, image: &[u8]) -> Result<Recognition> {
        (**self).recognize(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_counts_as_no_text() {
        assert_eq!(Recognition::from_text(None), Recognition::NoText);
        assert_eq!(
            Recognition::from_text(Some(" \n ".to_owned())),
            Recognition::NoText
        );
        assert_eq!(
            Recognition::from_text(Some("Room-1".to_owned())).text(),
            Some("Room-1")
        );
    }
}

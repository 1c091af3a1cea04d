// Screenshot types and options
//
// Configuration for canvas captures, forwarded to the renderer as-is.

use serde::Serialize;

/// Screenshot image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotFormat {
    /// PNG format (lossless, supports transparency)
    Png,
    /// JPEG format (lossy compression, smaller file size)
    Jpeg,
}

/// Clip region for screenshot
///
/// Specifies a rectangular region of the canvas to capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenshotClip {
    /// X coordinate of clip region origin
    pub x: f64,
    /// Y coordinate of clip region origin
    pub y: f64,
    /// Width of clip region
    pub width: f64,
    /// Height of clip region
    pub height: f64,
}

/// Screenshot options
///
/// Use the builder pattern to construct options:
///
/// ```ignore
/// use puppet_canvas::{ScreenshotFormat, ScreenshotOptions};
///
/// let options = ScreenshotOptions::builder()
///     .format(ScreenshotFormat::Jpeg)
///     .quality(80)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScreenshotOptions {
    /// Image format (png or jpeg)
    pub format: Option<ScreenshotFormat>,
    /// JPEG quality (0-100), only applies to jpeg format
    pub quality: Option<u8>,
    /// Hide default white background (PNG only)
    pub omit_background: Option<bool>,
    /// Clip region to capture
    pub clip: Option<ScreenshotClip>,
}

impl ScreenshotOptions {
    /// Create a new builder for ScreenshotOptions
    pub fn builder() -> ScreenshotOptionsBuilder {
        ScreenshotOptionsBuilder::default()
    }

    /// Convert options to JSON value for the wire
    pub(crate) fn to_json(&self) -> serde_json::Value {
        let mut json = serde_json::json!({});

        if let Some(format) = &self.format {
            json["type"] = serde_json::to_value(format).unwrap();
        }

        if let Some(quality) = self.quality {
            json["quality"] = serde_json::json!(quality);
        }

        if let Some(omit_background) = self.omit_background {
            json["omitBackground"] = serde_json::json!(omit_background);
        }

        if let Some(clip) = &self.clip {
            json["clip"] = serde_json::to_value(clip).unwrap();
        }

        json
    }
}

/// Builder for ScreenshotOptions
#[derive(Debug, Clone, Default)]
pub struct ScreenshotOptionsBuilder {
    format: Option<ScreenshotFormat>,
    quality: Option<u8>,
    omit_background: Option<bool>,
    clip: Option<ScreenshotClip>,
}

impl ScreenshotOptionsBuilder {
    /// Set the image format (png or jpeg)
    pub fn format(mut self, format: ScreenshotFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set JPEG quality (0-100)
    ///
    /// Only applies when format is Jpeg.
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Hide default white background (creates transparent PNG)
    pub fn omit_background(mut self, omit_background: bool) -> Self {
        self.omit_background = Some(omit_background);
        self
    }

    /// Set clip region to capture
    pub fn clip(mut self, clip: ScreenshotClip) -> Self {
        self.clip = Some(clip);
        self
    }

    /// Build the ScreenshotOptions
    pub fn build(self) -> ScreenshotOptions {
        ScreenshotOptions {
            format: self.format,
            quality: self.quality,
            omit_background: self.omit_background,
            clip: self.clip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_serialization() {
        assert_eq!(
            serde_json::to_string(&ScreenshotFormat::Png).unwrap(),
            "\"png\""
        );
        assert_eq!(
            serde_json::to_string(&ScreenshotFormat::Jpeg).unwrap(),
            "\"jpeg\""
        );
    }

    #[test]
    fn test_default_options_are_empty() {
        let json = ScreenshotOptions::default().to_json();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_builder_jpeg_with_quality() {
        let options = ScreenshotOptions::builder()
            .format(ScreenshotFormat::Jpeg)
            .quality(80)
            .build();

        let json = options.to_json();
        assert_eq!(json["type"], "jpeg");
        assert_eq!(json["quality"], 80);
    }

    #[test]
    fn test_builder_clip() {
        let clip = ScreenshotClip {
            x: 10.0,
            y: 20.0,
            width: 300.0,
            height: 200.0,
        };
        let options = ScreenshotOptions::builder().clip(clip).build();

        let json = options.to_json();
        assert_eq!(json["clip"]["x"], 10.0);
        assert_eq!(json["clip"]["y"], 20.0);
        assert_eq!(json["clip"]["width"], 300.0);
        assert_eq!(json["clip"]["height"], 200.0);
    }

    #[test]
    fn test_builder_omit_background() {
        let options = ScreenshotOptions::builder().omit_background(true).build();

        let json = options.to_json();
        assert_eq!(json["omitBackground"], true);
    }
}

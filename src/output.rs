use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg {
        /// 1-100
        #[serde(default = "default_quality")]
        quality: u8,
    },
    Png,
}

fn default_quality() -> u8 {
    90
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Jpeg { quality: default_quality() }
    }
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg { .. } => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

/// `social-post-<unix millis>.<ext>`
pub fn download_filename(format: OutputFormat, at: DateTime<Utc>) -> String {
    format!("social-post-{}.{}", at.timestamp_millis(), format.extension())
}

/// Lowercase, ASCII alphanumerics and single hyphens only.
pub fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if (c.is_whitespace() || c == '-') && !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// File name derived from the poster title, `poster.<ext>` if the title has
/// nothing usable in it.
pub fn title_filename(title: &str, format: OutputFormat) -> String {
    match slug(title) {
        s if s.is_empty() => format!("poster.{}", format.extension()),
        s => format!("{}.{}", s, format.extension()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{download_filename, slug, title_filename, OutputFormat};

    #[test]
    fn download_name_uses_millis() {
        let at = Utc.timestamp_millis_opt(1_764_780_609_419).unwrap();
        assert_eq!("social-post-1764780609419.jpg", download_filename(OutputFormat::default(), at));
        assert_eq!("social-post-1764780609419.png", download_filename(OutputFormat::Png, at));
    }

    #[test]
    fn slugs() {
        assert_eq!("ustica-blue-lab", slug("  Ustica Blue Lab "));
        assert_eq!("techno-party-2025", slug("Techno   Party -- 2025!"));
        assert_eq!("caff-letterario", slug("Caffè Letterario"));
        assert_eq!("", slug("!!!"));
        assert_eq!("poster.png", title_filename("???", OutputFormat::Png));
        assert_eq!("ustica-blue-lab.jpg", title_filename("Ustica Blue Lab", OutputFormat::default()));
    }

    #[test]
    fn decode_output_format() {
        assert_eq!(
            OutputFormat::Jpeg { quality: 90 },
            serde_json::from_value::<OutputFormat>(json!({"format": "jpeg"})).unwrap()
        );
        assert_eq!(
            OutputFormat::Jpeg { quality: 75 },
            serde_json::from_value::<OutputFormat>(json!({"format": "jpeg", "quality": 75})).unwrap()
        );
        assert_eq!(OutputFormat::Png, serde_json::from_value::<OutputFormat>(json!({"format": "png"})).unwrap());
    }
}

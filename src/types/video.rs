use miette::miette;
use serde::Deserialize;
use time::{Date, Month};

use crate::result::Result;

/// One stream variant as reported by the engine. Kept in the engine's
/// own preference order and mostly opaque to the facade.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamFormat {
    pub format_id: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub format_note: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    // The engine reports sizes as integers or floats depending on whether
    // they are exact or estimated, so both parse as floats
    #[serde(default)]
    pub filesize: Option<f64>,
    #[serde(default)]
    pub filesize_approx: Option<f64>,
    #[serde(default)]
    pub tbr: Option<f64>,
}

impl StreamFormat {
    /// One display line for this stream, e.g.
    /// `137 mp4 1920x1080 30fps avc1 (248.3 MiB)`.
    pub fn label(&self) -> String {
        let mut parts = vec![self.format_id.clone()];

        if let Some(ext) = &self.ext {
            parts.push(ext.clone());
        }

        match (&self.resolution, self.width, self.height) {
            (Some(res), ..) => parts.push(res.clone()),
            (None, Some(w), Some(h)) => parts.push(format!("{w}x{h}")),
            _ => {}
        }

        if let Some(fps) = self.fps {
            parts.push(format!("{fps:.0}fps"));
        }

        match (self.vcodec.as_deref(), self.acodec.as_deref()) {
            (Some("none") | None, Some(acodec)) if acodec != "none" => {
                parts.push(format!("audio only ({acodec})"));
            }
            (Some(vcodec), _) if vcodec != "none" => {
                parts.push(vcodec.split('.').next().unwrap_or(vcodec).to_string());
            }
            _ => {}
        }

        if let Some(tbr) = self.tbr {
            parts.push(format!("{tbr:.0}k"));
        }

        if let Some(note) = &self.format_note {
            parts.push(note.clone());
        }

        if let Some(size) = self.filesize.or(self.filesize_approx) {
            parts.push(format!("({:.1} MiB)", size / 1_048_576.0));
        }

        parts.join(" ")
    }
}

/// Immutable snapshot of one video's metadata, normalized from the
/// engine's raw payload.
///
/// `id` and `url` are always present and non-empty; fields the platform
/// may omit are `Option`s instead of magic sentinel values, so consumers
/// can branch on them statically.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Length in seconds, 0 when the platform does not report one
    pub duration: u64,
    pub uploader: Option<String>,
    pub upload_date: Option<Date>,
    pub view_count: Option<u64>,
    pub thumbnail: Option<String>,
    /// Engine-reported formats, insertion order = engine preference
    pub formats: Vec<StreamFormat>,
    /// Canonical URL this record was resolved from
    pub url: String,
}

impl VideoInfo {
    /// Build a record from the engine's metadata payload.
    ///
    /// `requested_url` is kept as the canonical URL when the payload does
    /// not carry one itself. Format entries the engine reports without an
    /// identifier (storyboards, data tracks) are dropped.
    pub fn from_json(json: &serde_json::Value, requested_url: &str) -> Result<Self> {
        let json = json
            .as_object()
            .ok_or_else(|| miette!("Engine metadata payload is not a JSON object"))?;

        let get_str = |key: &str| json.get(key).and_then(|v| v.as_str());

        let id = get_str("id")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| miette!("Engine metadata has no video id"))?
            .to_owned();

        let url = get_str("webpage_url")
            .or(get_str("original_url"))
            .filter(|s| !s.is_empty())
            .unwrap_or(requested_url)
            .to_owned();

        let duration = json
            .get("duration")
            .and_then(|v| v.as_f64())
            .map_or(0, |secs| secs.max(0.0) as u64);

        let formats = json
            .get("formats")
            .and_then(|v| v.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            id,
            title: get_str("title").unwrap_or_default().to_owned(),
            description: get_str("description").unwrap_or_default().to_owned(),
            duration,
            uploader: get_str("uploader").map(str::to_owned),
            upload_date: get_str("upload_date").and_then(parse_upload_date),
            view_count: json.get("view_count").and_then(|v| v.as_u64()),
            thumbnail: get_str("thumbnail").map(str::to_owned),
            formats,
            url,
        })
    }
}

/// Parse the engine's compact `YYYYMMDD` date form.
fn parse_upload_date(s: &str) -> Option<Date> {
    if s.len() != 8 || !s.is_ascii() {
        return None;
    }

    let year = s[0..4].parse().ok()?;
    let month: u8 = s[4..6].parse().ok()?;
    let day: u8 = s[6..8].parse().ok()?;

    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

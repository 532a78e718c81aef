use super::ReportError;
use crate::config::ModuleConfig;
use chrono::NaiveDate;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackSource {
    Folder(PathBuf),
    Playlist(String),
}

/// What to put in a tracks report and where to write it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub source: TrackSource,
    /// Inclusive bounds on the track stock date.
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub output_folder: PathBuf,
}

impl ReportRequest {
    pub fn new<P: Into<PathBuf>>(source: TrackSource, output_folder: P) -> Self {
        Self {
            source,
            date_from: None,
            date_to: None,
            output_folder: output_folder.into(),
        }
    }

    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// Builds a request from the `tracks-report` module fields.
    pub fn from_module(module: &ModuleConfig) -> Result<Self, ReportError> {
        let source = match module.value("source") {
            "folder" => TrackSource::Folder(PathBuf::from(required(module, "folder")?)),
            "playlist" => TrackSource::Playlist(required(module, "playlist")?.to_string()),
            other => return Err(ReportError::InvalidSource(other.to_string())),
        };

        Ok(Self {
            source,
            date_from: optional_date(module, "date_from")?,
            date_to: optional_date(module, "date_to")?,
            output_folder: PathBuf::from(required(module, "output_folder")?),
        })
    }

    pub fn includes_stock_date(&self, stock_date: Option<&str>) -> bool {
        if self.date_from.is_none() && self.date_to.is_none() {
            return true;
        }
        // Stored dates may carry a time part after the day.
        let Some(date) = stock_date
            .and_then(|d| d.get(..10))
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        else {
            return false;
        };
        self.date_from.map_or(true, |from| date >= from) && self.date_to.map_or(true, |to| date <= to)
    }
}

fn required<'a>(module: &'a ModuleConfig, key: &str) -> Result<&'a str, ReportError> {
    match module.value(key) {
        "" => Err(ReportError::MissingValue(key.to_string())),
        value => Ok(value),
    }
}

fn optional_date(module: &ModuleConfig, key: &str) -> Result<Option<NaiveDate>, ReportError> {
    match module.value(key) {
        "" => Ok(None),
        value => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ReportError::InvalidDate {
                key: key.to_string(),
                value: value.to_string(),
            }),
    }
}

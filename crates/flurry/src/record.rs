//! Turning dump lines into destination rows.
//!
//! Each dump line reads `<project> <article> <views> <bytes>`. Lines are
//! checked by a fixed chain of rules; the first rule that fails decides the
//! [`Rejection`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::partition::Partition;

/// One pageview count as written to the destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageviewRow {
    pub project: String,
    pub article: String,
    pub views: u64,
    /// Serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub hour: u8,
    /// Serialized as RFC 3339.
    pub ingested_at: DateTime<Utc>,
}

/// Why a line produced no row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Fewer than three space-separated fields.
    TooFewFields,
    /// Project matched the exclusion list.
    Excluded,
    /// Views field is not a non-negative integer.
    InvalidViews,
}

impl Rejection {
    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::TooFewFields => "too_few_fields",
            Rejection::Excluded => "excluded",
            Rejection::InvalidViews => "invalid_views",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values shared by every row of one file.
#[derive(Debug, Clone, Copy)]
pub struct RowContext {
    pub partition: Partition,
    /// Captured once, when the file's stream is opened.
    pub ingested_at: DateTime<Utc>,
}

/// Line filter and shaper.
#[derive(Debug, Clone)]
pub struct RowShaper {
    exclude_project_prefixes: Vec<String>,
}

impl RowShaper {
    pub fn new(exclude_project_prefixes: Vec<String>) -> Self {
        Self {
            exclude_project_prefixes,
        }
    }

    pub fn is_excluded(&self, project: &str) -> bool {
        self.exclude_project_prefixes
            .iter()
            .any(|prefix| project.starts_with(prefix.as_str()))
    }

    /// Shape one line into a row or say why it was dropped.
    pub fn shape(&self, line: &str, ctx: &RowContext) -> Result<PageviewRow, Rejection> {
        let mut fields = line.trim().split(' ');
        let (Some(project), Some(article), Some(views)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(Rejection::TooFewFields);
        };

        if self.is_excluded(project) {
            return Err(Rejection::Excluded);
        }

        let views = views.parse::<u64>().map_err(|_| Rejection::InvalidViews)?;

        Ok(PageviewRow {
            project: project.to_string(),
            article: article.to_string(),
            views,
            date: ctx.partition.date,
            hour: ctx.partition.hour,
            ingested_at: ctx.ingested_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx() -> RowContext {
        RowContext {
            partition: Partition::from_filename("pageviews-20240115-070000.gz").unwrap(),
            ingested_at: Utc.with_ymd_and_hms(2024, 1, 16, 3, 0, 0).unwrap(),
        }
    }

    fn shaper() -> RowShaper {
        RowShaper::new(vec!["en".to_string()])
    }

    #[test]
    fn test_accepts_valid_line() {
        let row = shaper().shape("fr.wikipedia Paris 42\n", &ctx()).unwrap();
        assert_eq!(row.project, "fr.wikipedia");
        assert_eq!(row.article, "Paris");
        assert_eq!(row.views, 42);
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(row.hour, 7);
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let row = shaper().shape("de.wikipedia Berlin 7 0", &ctx()).unwrap();
        assert_eq!(row.views, 7);
    }

    #[test]
    fn test_rejection_reasons() {
        let shaper = shaper();
        let ctx = ctx();

        assert_eq!(shaper.shape("", &ctx), Err(Rejection::TooFewFields));
        assert_eq!(shaper.shape("fr.wikipedia Paris", &ctx), Err(Rejection::TooFewFields));
        assert_eq!(shaper.shape("en.wikipedia Paris 9000", &ctx), Err(Rejection::Excluded));
        assert_eq!(shaper.shape("en Paris 9000", &ctx), Err(Rejection::Excluded));
        assert_eq!(shaper.shape("fr.wikipedia Paris abc", &ctx), Err(Rejection::InvalidViews));
        assert_eq!(shaper.shape("fr.wikipedia Paris -3", &ctx), Err(Rejection::InvalidViews));
    }

    #[test]
    fn test_exclusion_checked_before_views() {
        assert_eq!(
            shaper().shape("en.wiktionary word abc", &ctx()),
            Err(Rejection::Excluded)
        );
    }

    #[test]
    fn test_empty_denylist_accepts_everything() {
        let shaper = RowShaper::new(Vec::new());
        assert!(shaper.shape("en.wikipedia Paris 9000", &ctx()).is_ok());
    }

    #[test]
    fn test_row_serializes_for_destination() {
        let row = shaper().shape("fr.wikipedia Paris 42", &ctx()).unwrap();
        let json = serde_json::to_value(&row).unwrap();

        assert_eq!(json["date"], "2024-01-15");
        assert_eq!(json["hour"], 7);
        assert_eq!(json["views"], 42);
        assert_eq!(json["ingested_at"], "2024-01-16T03:00:00Z");
    }
}

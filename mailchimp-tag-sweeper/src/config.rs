use crate::error::ConfigError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use url::Url;

/// How a tracked link's URL is compared to the confirmation URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum UrlMatch {
    /// The confirmation URL must appear somewhere in the tracked URL.
    #[default]
    Contains,
    Exact,
}

impl UrlMatch {
    pub fn matches(self, tracked_url: &str, confirmation_url: &str) -> bool {
        match self {
            UrlMatch::Contains => tracked_url.contains(confirmation_url),
            UrlMatch::Exact => tracked_url == confirmation_url,
        }
    }
}

/// What to do when several static segments share the requested tag name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum TagPolicy {
    /// Use the first segment returned by Mailchimp.
    #[default]
    FirstMatch,
    /// Fail instead of guessing.
    Strict,
}

/// Which campaign, tag and link the sweep is about.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub campaign_date: NaiveDate,
    pub campaign_title: String,
    pub tag_name: String,
    pub confirmation_url: String,
    /// Extra days before `campaign_date` included in the send window.
    pub lookback_days: u32,
    pub url_match: UrlMatch,
    pub tag_policy: TagPolicy,
}

impl Settings {
    pub fn new<S: Into<String>>(
        campaign_date: NaiveDate,
        campaign_title: S,
        tag_name: S,
        confirmation_url: S,
    ) -> Self {
        Self {
            campaign_date,
            campaign_title: campaign_title.into(),
            tag_name: tag_name.into(),
            confirmation_url: confirmation_url.into(),
            lookback_days: 0,
            url_match: UrlMatch::default(),
            tag_policy: TagPolicy::default(),
        }
    }

    /// Send-time window `[date - lookback_days, date + 1 day)`, both bounds at
    /// UTC midnight. Fails when a bound falls outside chrono's date range.
    pub fn send_window(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), ConfigError> {
        let midnight = self.campaign_date.and_time(chrono::NaiveTime::MIN).and_utc();
        let since = midnight
            .checked_sub_signed(Duration::days(i64::from(self.lookback_days)))
            .ok_or(ConfigError::InvalidWindow {
                date: self.campaign_date,
                lookback_days: self.lookback_days,
            })?;
        let before = midnight
            .checked_add_signed(Duration::days(1))
            .ok_or(ConfigError::InvalidWindow {
                date: self.campaign_date,
                lookback_days: self.lookback_days,
            })?;
        Ok((since, before))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunMode {
    pub dry_run: bool,
    pub force_delete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveMode {
    DryRun,
    AwaitConfirmation,
    Forced,
}

impl RunMode {
    /// Dry run wins over force: a dry run never mutates anything.
    pub fn archive_mode(self) -> ArchiveMode {
        if self.dry_run {
            ArchiveMode::DryRun
        } else if self.force_delete {
            ArchiveMode::Forced
        } else {
            ArchiveMode::AwaitConfirmation
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub base_url: Url,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl Credentials {
    /// Builds credentials from a Mailchimp API key of the form `<key>-<dc>`.
    ///
    /// Without an explicit `base_url` the data center suffix selects
    /// `https://<dc>.api.mailchimp.com`.
    pub fn from_api_key(
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let base_url = match base_url.filter(|u| !u.trim().is_empty()) {
            Some(url) => url,
            None => {
                let dc = data_center(&api_key).ok_or(ConfigError::MalformedApiKey)?;
                format!("https://{}.api.mailchimp.com", dc)
            }
        };
        let base_url =
            Url::parse(&base_url).map_err(|e| ConfigError::InvalidBaseUrl(base_url.clone(), e))?;

        Ok(Self { api_key, base_url })
    }
}

fn data_center(api_key: &str) -> Option<&str> {
    api_key
        .rsplit_once('-')
        .map(|(_, dc)| dc)
        .filter(|dc| !dc.is_empty())
}

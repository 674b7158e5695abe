use crate::models::MailchimpError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Resolve(#[from] ResolveError),
    #[error("{0}")]
    FetchMember(#[from] FetchMemberError),
    #[error("{0}")]
    Archive(#[from] ArchiveError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No API key provided (set MAILCHIMP_API_KEY)")]
    MissingApiKey,
    #[error("API key has no data center suffix (expected `<key>-<dc>`)")]
    MalformedApiKey,
    #[error("Invalid base URL {0}: {1}")]
    InvalidBaseUrl(String, url::ParseError),
    #[error("Send window of {date} with {lookback_days} lookback days is out of range")]
    InvalidWindow {
        date: chrono::NaiveDate,
        lookback_days: u32,
    },
    #[error("Could not build HTTP client: {0}")]
    HttpClient(reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Mailchimp error: {0}")]
    Mailchimp(MailchimpError),
    #[error("Invalid request path: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Found {count} matching campaigns. Response was {raw}")]
    Campaign { count: usize, raw: String },
    #[error("Found no matching tag named {name:?}. Response was {raw}")]
    TagNotFound { name: String, raw: String },
    #[error("Found {count} tags named {name:?}, refusing to pick one")]
    AmbiguousTag { name: String, count: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum FetchMemberError {
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("Pagination not supported: {total} members reported, {returned} returned (page size {page_size})")]
    PaginationNotSupported {
        total: u64,
        returned: usize,
        page_size: usize,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Error while submitting batch delete for {0} members: {1}")]
    Api(usize, ApiError),
    #[error("Could not read confirmation: {0}")]
    Prompt(#[from] std::io::Error),
}

use crate::{
    config::{Credentials, Settings, TagPolicy, UrlMatch},
    error::{ApiError, ConfigError, Error, FetchMemberError, ResolveError},
    models::{
        CampaignInfo, MailchimpBatchRequest, MailchimpBatchResponse, MailchimpCampaignsResponse,
        MailchimpClickDetailsResponse, MailchimpClickMembersResponse, MailchimpError,
        MailchimpSegmentMembersResponse, MailchimpSegmentsResponse, Member,
    },
};
use async_gen::gen;
use chrono::SecondsFormat;
use futures_core::Stream;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

// Mailchimp ignores the username part of basic auth.
const AUTH_USER: &str = "anystring";

#[derive(Debug, Clone, Copy)]
pub struct PageSize(usize);

impl Default for PageSize {
    fn default() -> Self {
        Self(1000)
    }
}

impl PageSize {
    pub fn get(&self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
pub struct Client {
    api_url: Url,
    api_key: String,
    http: reqwest::Client,
    page_size: PageSize,
}

/// A Mailchimp client exposing the handful of read calls the sweep needs plus
/// the single batch delete.
impl Client {
    /// Initializes a new client talking to `base_url` (e.g.
    /// `https://us6.api.mailchimp.com`). All paths live under `/3.0/`.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        let base = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl(base_url.to_string(), e))?;
        Self::with_url(base, api_key)
    }

    pub fn from_credentials(credentials: &Credentials) -> Result<Self, ConfigError> {
        Self::with_url(credentials.base_url.clone(), &credentials.api_key)
    }

    fn with_url(mut base: Url, api_key: &str) -> Result<Self, ConfigError> {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let api_url = base
            .join("3.0/")
            .map_err(|e| ConfigError::InvalidBaseUrl(base.to_string(), e))?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            api_url,
            api_key: api_key.to_string(),
            http,
            page_size: Default::default(),
        })
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.api_url.join(path)?;
        debug!(%url, ?query, "GET");
        let resp = self
            .http
            .get(url)
            .query(query)
            .basic_auth(AUTH_USER, Some(&self.api_key))
            .send()
            .await?;

        read_json(resp).await
    }

    /// Resolves the campaign sent in the settings' window with exactly the
    /// configured title.
    pub async fn get_campaign_info(&self, settings: &Settings) -> Result<CampaignInfo, Error> {
        let (since, before) = settings.send_window()?;
        let body: MailchimpCampaignsResponse = self
            .get(
                "campaigns",
                &[
                    (
                        "fields",
                        [
                            "campaigns.id",
                            "campaigns.settings.title",
                            "campaigns.recipients.list_id",
                        ]
                        .join(","),
                    ),
                    (
                        "since_send_time",
                        since.to_rfc3339_opts(SecondsFormat::Secs, true),
                    ),
                    (
                        "before_send_time",
                        before.to_rfc3339_opts(SecondsFormat::Secs, true),
                    ),
                ],
            )
            .await?;

        let matching: Vec<_> = body
            .campaigns
            .iter()
            .filter(|c| c.settings.title == settings.campaign_title)
            .collect();

        match matching.as_slice() {
            [campaign] => Ok(CampaignInfo {
                campaign_id: campaign.id.clone(),
                list_id: campaign.recipients.list_id.clone(),
            }),
            _ => Err(ResolveError::Campaign {
                count: matching.len(),
                raw: serde_json::to_string(&body).unwrap_or_default(),
            }
            .into()),
        }
    }

    /// Ids of the tracked links in the campaign whose URL matches
    /// `confirmation_url`. An empty result is not an error.
    pub async fn get_link_ids(
        &self,
        campaign_id: &str,
        confirmation_url: &str,
        url_match: UrlMatch,
    ) -> Result<Vec<String>, ApiError> {
        let body: MailchimpClickDetailsResponse = self
            .get(
                &format!("reports/{}/click-details", campaign_id),
                &[(
                    "fields",
                    ["urls_clicked.id", "urls_clicked.url"].join(","),
                )],
            )
            .await?;

        Ok(body
            .urls_clicked
            .into_iter()
            .filter(|link| url_match.matches(&link.url, confirmation_url))
            .map(|link| link.id)
            .collect())
    }

    /// Finds the static segment (tag) with the given name inside the list.
    pub async fn get_tag_id(
        &self,
        list_id: &str,
        tag_name: &str,
        policy: TagPolicy,
    ) -> Result<String, Error> {
        let body: MailchimpSegmentsResponse = self
            .get(
                &format!("lists/{}/segments", list_id),
                &[
                    ("fields", ["segments.id", "segments.name"].join(",")),
                    ("type", "static".to_string()),
                ],
            )
            .await?;

        let tags: Vec<_> = body.segments.iter().filter(|s| s.name == tag_name).collect();
        match (tags.first(), tags.len(), policy) {
            (None, _, _) => Err(ResolveError::TagNotFound {
                name: tag_name.to_string(),
                raw: serde_json::to_string(&body).unwrap_or_default(),
            }
            .into()),
            (Some(_), count, TagPolicy::Strict) if count > 1 => Err(ResolveError::AmbiguousTag {
                name: tag_name.to_string(),
                count,
            }
            .into()),
            (Some(tag), count, _) => {
                if count > 1 {
                    warn!(
                        tag_name,
                        count,
                        tag_id = %tag.id,
                        "Several tags share this name, using the first one"
                    );
                }
                Ok(tag.id.clone())
            }
        }
    }

    /// All members carrying the tag. Fails rather than returning a partial
    /// page when the tag has more members than fit in one page.
    pub async fn fetch_tagged_members(
        &self,
        list_id: &str,
        tag_id: &str,
    ) -> Result<Vec<Member>, FetchMemberError> {
        let body: MailchimpSegmentMembersResponse = self
            .get(
                &format!("lists/{}/segments/{}/members", list_id, tag_id),
                &[
                    (
                        "fields",
                        ["members.id", "members.email_address", "total_items"].join(","),
                    ),
                    ("count", self.page_size.0.to_string()),
                ],
            )
            .await?;

        self.ensure_single_page(body.total_items, body.members.len())?;
        Ok(body.members)
    }

    /// All members who clicked one tracked link, with the same single-page
    /// restriction as [`Client::fetch_tagged_members`].
    pub async fn fetch_link_clickers(
        &self,
        campaign_id: &str,
        link_id: &str,
    ) -> Result<Vec<Member>, FetchMemberError> {
        let body: MailchimpClickMembersResponse = self
            .get(
                &format!("reports/{}/click-details/{}/members", campaign_id, link_id),
                &[
                    (
                        "fields",
                        ["members.email_id", "members.email_address", "total_items"].join(","),
                    ),
                    ("count", self.page_size.0.to_string()),
                ],
            )
            .await?;

        self.ensure_single_page(body.total_items, body.members.len())?;
        Ok(body.members.into_iter().map(Member::from).collect())
    }

    /// Streams the members who clicked any of `link_ids`, one link at a time.
    /// A member who clicked several links is yielded once per link.
    ///
    /// ## Example
    ///
    /// ```no_run
    /// use futures_util::StreamExt;
    /// use mailchimp_tag_sweeper::Client;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = Client::new("https://us6.api.mailchimp.com", "abcd1234-us6")?;
    ///     let link_ids = vec!["link-1".to_string(), "link-2".to_string()];
    ///     let stream = client.fetch_clicked_members("campaign-id", &link_ids);
    ///     futures_util::pin_mut!(stream);
    ///
    ///     while let Some(member) = stream.next().await {
    ///         println!("Clicked: {:?}", member?);
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn fetch_clicked_members<'a>(
        &'a self,
        campaign_id: &'a str,
        link_ids: &'a [String],
    ) -> impl Stream<Item = Result<Member, FetchMemberError>> + 'a {
        let g = gen! {
            for link_id in link_ids {
                match self.fetch_link_clickers(campaign_id, link_id).await {
                    Ok(members) => {
                        debug!(link_id = %link_id, count = members.len(), "Fetched link clickers");
                        for member in members {
                            yield Ok(member);
                        }
                    }
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }

            ()
        };

        g.into_async_iter()
    }

    /// Submits one batch with a `DELETE` per member and returns the batch id.
    /// The batch runs asynchronously on Mailchimp's side and is not awaited.
    pub async fn submit_batch_delete(
        &self,
        list_id: &str,
        member_ids: &[String],
    ) -> Result<String, ApiError> {
        let url = self.api_url.join("batches")?;
        debug!(%url, operations = member_ids.len(), "POST");
        let resp = self
            .http
            .post(url)
            .basic_auth(AUTH_USER, Some(&self.api_key))
            .json(&MailchimpBatchRequest::delete_members(list_id, member_ids))
            .send()
            .await?;

        let body: MailchimpBatchResponse = read_json(resp).await?;
        Ok(body.id)
    }

    fn ensure_single_page(&self, total: u64, returned: usize) -> Result<(), FetchMemberError> {
        if total > returned as u64 {
            return Err(FetchMemberError::PaginationNotSupported {
                total,
                returned,
                page_size: self.page_size.0,
            });
        }
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await?;
        return match serde_json::from_str::<MailchimpError>(&text) {
            Ok(body) => Err(ApiError::Mailchimp(body)),
            Err(_) => Err(ApiError::Mailchimp(MailchimpError {
                title: status
                    .canonical_reason()
                    .unwrap_or("Unexpected status")
                    .to_string(),
                status: status.as_u16(),
                detail: Some(text),
                ..Default::default()
            })),
        };
    }

    Ok(resp.json().await?)
}

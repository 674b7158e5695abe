use crate::{
    client::Client,
    config::{ArchiveMode, RunMode, Settings},
    error::{ArchiveError, Error},
    models::{CampaignInfo, Member},
    prompt::Confirm,
};
use futures_util::StreamExt;
use std::collections::{btree_map, BTreeMap};
use tracing::{info, warn};

/// Members keyed by id, mapped to their email address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberSet(BTreeMap<String, String>);

impl MemberSet {
    pub fn from_members<I: IntoIterator<Item = Member>>(members: I) -> Self {
        Self(
            members
                .into_iter()
                .map(|m| (m.id, m.email_address))
                .collect(),
        )
    }

    pub fn remove_all<'a, I: IntoIterator<Item = &'a Member>>(&mut self, members: I) {
        for member in members {
            self.0.remove(&member.id);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Tagged members minus everyone who clicked. Order and duplicates in
/// `clicked` don't matter.
pub fn archive_candidates(tagged: Vec<Member>, clicked: &[Member]) -> MemberSet {
    let mut candidates = MemberSet::from_members(tagged);
    candidates.remove_all(clicked);
    candidates
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Nothing left to archive, so no prompt and no request.
    Empty,
    DryRun { count: usize },
    Declined { count: usize },
    Submitted { count: usize, batch_id: String },
}

impl ArchiveOutcome {
    pub fn batch_id(&self) -> Option<&str> {
        match self {
            ArchiveOutcome::Submitted { batch_id, .. } => Some(batch_id),
            _ => None,
        }
    }
}

/// Archives `member_ids` with a single batch request, unless the run mode or
/// the user says otherwise.
pub async fn archive_members(
    client: &Client,
    list_id: &str,
    member_ids: &[String],
    mode: RunMode,
    confirm: &mut dyn Confirm,
) -> Result<ArchiveOutcome, ArchiveError> {
    let count = member_ids.len();
    if count == 0 {
        info!("No members to archive");
        return Ok(ArchiveOutcome::Empty);
    }

    match mode.archive_mode() {
        ArchiveMode::DryRun => {
            info!("Would archive {} members", count);
            return Ok(ArchiveOutcome::DryRun { count });
        }
        ArchiveMode::AwaitConfirmation => {
            if !confirm.confirm(&format!("Delete {} members?", count))? {
                info!("Archiving declined");
                return Ok(ArchiveOutcome::Declined { count });
            }
        }
        ArchiveMode::Forced => {}
    }

    let batch_id = client
        .submit_batch_delete(list_id, member_ids)
        .await
        .map_err(|e| ArchiveError::Api(count, e))?;
    info!("Archiving members by batch operation with ID {}", batch_id);

    Ok(ArchiveOutcome::Submitted { count, batch_id })
}

#[derive(Debug, Clone)]
pub struct SweepReport {
    pub campaign: CampaignInfo,
    pub link_ids: Vec<String>,
    pub tag_id: String,
    pub tagged: usize,
    pub clicked: usize,
    pub candidates: MemberSet,
    pub outcome: ArchiveOutcome,
}

/// Resolves the campaign, link and tag, then archives every tagged member who
/// didn't click the confirmation link.
///
/// ## Example
///
/// ```no_run
/// use chrono::NaiveDate;
/// use mailchimp_tag_sweeper::{sweep, Client, LineConfirm, RunMode, Settings};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::new("https://us6.api.mailchimp.com", "abcd1234-us6")?;
///     let settings = Settings::new(
///         NaiveDate::from_ymd_opt(2020, 3, 25).unwrap(),
///         "Inaktive Abonnenten Entfernen",
///         "Inactive",
///         "createrawvision.de/newsletter-abo-bestaetigt",
///     );
///     let mode = RunMode { dry_run: true, force_delete: false };
///     let report = sweep::run(&client, &settings, mode, &mut LineConfirm::stdio()).await?;
///     println!("{:?}", report.outcome);
///     Ok(())
/// }
/// ```
pub async fn run(
    client: &Client,
    settings: &Settings,
    mode: RunMode,
    confirm: &mut dyn Confirm,
) -> Result<SweepReport, Error> {
    info!(
        "Sending request for {}",
        serde_json::to_string_pretty(settings).unwrap_or_default()
    );

    let campaign = client.get_campaign_info(settings).await?;
    info!(
        "Received campaignId {} and listId {}",
        campaign.campaign_id, campaign.list_id
    );

    let link_ids = client
        .get_link_ids(
            &campaign.campaign_id,
            &settings.confirmation_url,
            settings.url_match,
        )
        .await?;
    if link_ids.is_empty() {
        warn!(
            confirmation_url = %settings.confirmation_url,
            "No tracked link matches the confirmation URL, nobody counts as confirmed"
        );
    }
    info!("Received linkIds {}", link_ids.join(" "));

    let tag_id = client
        .get_tag_id(&campaign.list_id, &settings.tag_name, settings.tag_policy)
        .await?;
    info!("Received tagId {}", tag_id);

    let tagged = client
        .fetch_tagged_members(&campaign.list_id, &tag_id)
        .await?;
    let tagged_count = tagged.len();
    info!("Received {} members", tagged_count);

    let mut clicked = vec![];
    {
        let stream = client.fetch_clicked_members(&campaign.campaign_id, &link_ids);
        futures_util::pin_mut!(stream);
        while let Some(member) = stream.next().await {
            clicked.push(member?);
        }
    }
    info!("{} clicks received", clicked.len());

    let candidates = archive_candidates(tagged, &clicked);
    info!("{} members did not confirm", candidates.len());

    let outcome = archive_members(
        client,
        &campaign.list_id,
        &candidates.ids(),
        mode,
        confirm,
    )
    .await?;

    Ok(SweepReport {
        campaign,
        link_ids,
        tag_id,
        tagged: tagged_count,
        clicked: clicked.len(),
        candidates,
        outcome,
    })
}

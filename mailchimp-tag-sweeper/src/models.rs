use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

/// A list member reduced to what the sweep needs.
///
/// The `id` is Mailchimp's subscriber hash (MD5 of the lowercased email), so
/// the same person has the same id in segment listings and click reports.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    pub email_address: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CampaignInfo {
    pub campaign_id: String,
    pub list_id: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct MailchimpCampaignSettings {
    #[serde(default)]
    pub title: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct MailchimpCampaignRecipients {
    #[serde(default)]
    pub list_id: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct MailchimpCampaign {
    pub id: String,
    #[serde(default)]
    pub settings: MailchimpCampaignSettings,
    #[serde(default)]
    pub recipients: MailchimpCampaignRecipients,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct MailchimpCampaignsResponse {
    #[serde(default)]
    pub campaigns: Vec<MailchimpCampaign>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct MailchimpUrlClicked {
    pub id: String,
    pub url: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct MailchimpClickDetailsResponse {
    #[serde(default)]
    pub urls_clicked: Vec<MailchimpUrlClicked>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct MailchimpSegment {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct MailchimpSegmentsResponse {
    #[serde(default)]
    pub segments: Vec<MailchimpSegment>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct MailchimpSegmentMembersResponse {
    #[serde(default)]
    pub members: Vec<Member>,
    pub total_items: u64,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct MailchimpClickMember {
    pub email_id: String,
    pub email_address: String,
}

impl From<MailchimpClickMember> for Member {
    fn from(member: MailchimpClickMember) -> Self {
        Self {
            id: member.email_id,
            email_address: member.email_address,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct MailchimpClickMembersResponse {
    #[serde(default)]
    pub members: Vec<MailchimpClickMember>,
    pub total_items: u64,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct MailchimpBatchOperation {
    pub method: String,
    pub path: String,
    pub operation_id: String,
}

#[derive(Serialize, Clone, Debug, Default)]
pub struct MailchimpBatchRequest {
    pub operations: Vec<MailchimpBatchOperation>,
}

impl MailchimpBatchRequest {
    /// One `DELETE` per member, tagged with the member id so results can be
    /// correlated once the batch finishes.
    pub fn delete_members(list_id: &str, member_ids: &[String]) -> Self {
        Self {
            operations: member_ids
                .iter()
                .map(|id| MailchimpBatchOperation {
                    method: "DELETE".to_string(),
                    path: format!("/lists/{}/members/{}", list_id, id),
                    operation_id: id.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct MailchimpBatchResponse {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MailchimpError {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: Option<String>,
    pub instance: Option<String>,
}

impl Display for MailchimpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(
            format!(
                "{} ({}): {}",
                self.title,
                self.status,
                self.detail.clone().unwrap_or_default()
            )
            .as_str(),
        )
    }
}

// Segment ids come back as integers while every other id is a string.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s,
        Id::Num(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_id_accepts_numbers_and_strings() {
        let body: MailchimpSegmentsResponse = serde_json::from_str(
            r#"{"segments":[{"id":4711,"name":"Inactive"},{"id":"42","name":"Other"}]}"#,
        )
        .unwrap();
        assert_eq!(body.segments[0].id, "4711");
        assert_eq!(body.segments[1].id, "42");
    }

    #[test]
    fn click_member_maps_email_id_to_member_id() {
        let body: MailchimpClickMembersResponse = serde_json::from_str(
            r#"{"members":[{"email_id":"abc","email_address":"a@example.com"}],"total_items":1}"#,
        )
        .unwrap();
        let member: Member = body.members.into_iter().next().unwrap().into();
        assert_eq!(
            member,
            Member {
                id: "abc".into(),
                email_address: "a@example.com".into()
            }
        );
    }

    #[test]
    fn batch_request_has_one_delete_per_member() {
        let request =
            MailchimpBatchRequest::delete_members("list1", &["a".to_string(), "c".to_string()]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "operations": [
                    {"method": "DELETE", "path": "/lists/list1/members/a", "operation_id": "a"},
                    {"method": "DELETE", "path": "/lists/list1/members/c", "operation_id": "c"},
                ]
            })
        );
    }

    #[test]
    fn error_display_includes_detail() {
        let err = MailchimpError {
            r#type: "https://mailchimp.com/developer/marketing/docs/errors/".into(),
            title: "Resource Not Found".into(),
            status: 404,
            detail: Some("The requested resource could not be found.".into()),
            instance: None,
        };
        assert_eq!(
            err.to_string(),
            "Resource Not Found (404): The requested resource could not be found."
        );
    }
}

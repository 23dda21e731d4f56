use serde::{ Serialize, Deserialize };

/// Body of `POST /generate`. Fields are optional here so that a missing field
/// surfaces as a validation error instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
}

/// A request whose three fields are known to be present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostBrief {
    pub topic: String,
    pub platform: String,
    pub tone: String,
}

impl GenerateRequest {
    pub fn into_brief(self) -> Option<PostBrief> {
        let topic = self.topic.filter(|s| !s.is_empty())?;
        let platform = self.platform.filter(|s| !s.is_empty())?;
        let tone = self.tone.filter(|s| !s.is_empty())?;
        Some(PostBrief { topic, platform, tone })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub chat_id: String,
    pub user_request: String,
    pub response: String,
}

use crate::models::generate::PostBrief;

/// Characters of the topic kept in a conversation title.
pub const TITLE_PREFIX_CHARS: usize = 25;
pub const TITLE_ELLIPSIS: &str = "...";

/// Title stored on a new conversation: the topic's first characters plus an ellipsis.
pub fn conversation_title(topic: &str) -> String {
    let mut title: String = topic.chars().take(TITLE_PREFIX_CHARS).collect();
    title.push_str(TITLE_ELLIPSIS);
    title
}

/// Text of the `user` message recorded for a generation request.
pub fn format_user_request(brief: &PostBrief) -> String {
    format!(
        "**Topic:** {}\n**Platform:** {}\n**Tone:** {}",
        brief.topic,
        brief.platform,
        brief.tone
    )
}

/// The single prompt sent to the content generator.
pub fn build_generation_prompt(brief: &PostBrief) -> String {
    format!(
        "You are a social media expert. Create an engaging {platform} post about \"{topic}\". \
Use a {tone} tone. Include relevant hashtags and emojis where appropriate. \
Return only the post content.",
        platform = brief.platform,
        topic = brief.topic,
        tone = brief.tone
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sneaker() -> PostBrief {
        PostBrief {
            topic: "Launch of new sneaker".into(),
            platform: "Instagram".into(),
            tone: "Excited".into(),
        }
    }

    #[test]
    fn user_request_uses_fixed_template() {
        assert_eq!(
            format_user_request(&sneaker()),
            "**Topic:** Launch of new sneaker\n**Platform:** Instagram\n**Tone:** Excited"
        );
    }

    #[test]
    fn title_truncates_to_prefix_and_always_appends_ellipsis() {
        assert_eq!(conversation_title("Launch of new sneaker"), "Launch of new sneaker...");
        assert_eq!(
            conversation_title("Announcing our quarterly results webinar"),
            "Announcing our quarterly ..."
        );
        assert_eq!(conversation_title(""), "...");
    }

    #[test]
    fn title_counts_characters_not_bytes() {
        let topic = "é".repeat(30);
        let title = conversation_title(&topic);
        assert_eq!(title.chars().count(), TITLE_PREFIX_CHARS + TITLE_ELLIPSIS.len());
    }

    #[test]
    fn prompt_mentions_every_field() {
        let prompt = build_generation_prompt(&sneaker());
        assert!(prompt.starts_with("You are a social media expert."));
        assert!(prompt.contains("Instagram post"));
        assert!(prompt.contains("\"Launch of new sneaker\""));
        assert!(prompt.contains("Excited tone"));
    }

    #[test]
    fn placeholders_in_user_input_are_not_expanded() {
        let brief = PostBrief {
            topic: "{tone}".into(),
            platform: "X".into(),
            tone: "Calm".into(),
        };
        assert!(build_generation_prompt(&brief).contains("\"{tone}\""));
    }
}

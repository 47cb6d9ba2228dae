//! Moderation gate for player submissions.
//!
//! The gate runs before a submission is stored. It fails open: if the
//! classifier cannot be reached the submission passes. A submission the
//! provider's safety filter refuses to even classify is blocked.

use crate::generate::TextGenerator;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Moderation decision for one candidate turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Block,
}

/// Classifies candidate turns before they are committed.
#[async_trait]
pub trait Moderator: Send + Sync {
    async fn classify(&self, candidate: &str) -> Verdict;

    fn name(&self) -> &str;
}

/// Lets everything through. Used when moderation is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModeration;

#[async_trait]
impl Moderator for NoModeration {
    async fn classify(&self, _candidate: &str) -> Verdict {
        Verdict::Pass
    }

    fn name(&self) -> &str {
        "off"
    }
}

/// Asks the generation service for a one-word `PASS` / `BLOCK` verdict.
pub struct AiModerator {
    generator: Arc<dyn TextGenerator>,
}

impl AiModerator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

/// The classification prompt for one candidate.
pub fn moderation_prompt(candidate: &str) -> String {
    format!(
        "You are the content moderator of a public, multiplayer collaborative story.\n\
         Decide whether the submission below may be added to the shared story.\n\
         Block hate speech, harassment, sexual content, graphic gore, personal data and spam.\n\
         Silly, absurd or mildly rude contributions are fine.\n\
         Answer with exactly one word: PASS or BLOCK.\n\
         \n\
         Submission:\n\
         \"\"\"\n\
         {candidate}\n\
         \"\"\""
    )
}

/// Read a verdict out of a free-form reply.
///
/// Any occurrence of `PASS`, in any case, passes. A reply such as
/// "BYPASS" or "not a PASS" therefore passes too.
pub fn parse_verdict(reply: &str) -> Verdict {
    if reply.to_uppercase().contains("PASS") {
        Verdict::Pass
    } else {
        Verdict::Block
    }
}

#[async_trait]
impl Moderator for AiModerator {
    async fn classify(&self, candidate: &str) -> Verdict {
        match self.generator.generate(&moderation_prompt(candidate)).await {
            Ok(reply) => {
                let verdict = parse_verdict(&reply);
                debug!(?verdict, reply = %reply.trim(), "moderation verdict");
                verdict
            }
            Err(e) if e.is_content_block() => {
                info!(error = %e, "provider refused the submission");
                Verdict::Block
            }
            Err(e) => {
                warn!(
                    error = %e,
                    generator = self.generator.name(),
                    "moderation unavailable, letting submission through"
                );
                Verdict::Pass
            }
        }
    }

    fn name(&self) -> &str {
        "ai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;

    #[test]
    fn test_parse_verdict() {
        assert_eq!(parse_verdict("PASS"), Verdict::Pass);
        assert_eq!(parse_verdict("pass\n"), Verdict::Pass);
        assert_eq!(parse_verdict("BLOCK"), Verdict::Block);
        assert_eq!(parse_verdict(""), Verdict::Block);
        assert_eq!(parse_verdict("I cannot decide."), Verdict::Block);
    }

    #[test]
    fn test_parse_verdict_is_substring_based() {
        assert_eq!(parse_verdict("BYPASS"), Verdict::Pass);
        assert_eq!(parse_verdict("BLOCK (this would not PASS)"), Verdict::Pass);
    }

    #[test]
    fn test_prompt_embeds_candidate() {
        let prompt = moderation_prompt("a bowl of snail noodles");
        assert!(prompt.contains("a bowl of snail noodles"));
        assert!(prompt.contains("PASS or BLOCK"));
    }

    #[tokio::test]
    async fn test_ai_moderator_uses_reply() {
        let generator = Arc::new(ScriptedGenerator::new().then_reply("BLOCK").then_reply("Pass."));
        let moderator = AiModerator::new(generator.clone());

        assert_eq!(moderator.classify("first").await, Verdict::Block);
        assert_eq!(moderator.classify("second").await, Verdict::Pass);

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("first"));
    }

    #[tokio::test]
    async fn test_ai_moderator_fails_open() {
        let generator = Arc::new(ScriptedGenerator::new().then_fail("quota exceeded"));
        let moderator = AiModerator::new(generator);
        assert_eq!(moderator.classify("anything").await, Verdict::Pass);
    }

    #[tokio::test]
    async fn test_ai_moderator_blocks_provider_refusal() {
        let generator = Arc::new(ScriptedGenerator::new().then_refuse("SAFETY"));
        let moderator = AiModerator::new(generator);
        assert_eq!(moderator.classify("anything").await, Verdict::Block);
    }

    #[tokio::test]
    async fn test_no_moderation_passes() {
        assert_eq!(NoModeration.classify("anything").await, Verdict::Pass);
    }
}

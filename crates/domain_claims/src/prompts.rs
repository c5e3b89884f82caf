//! Prompt templates for the language-model assessments

use crate::claim::PolicyTier;
use crate::payout::Payout;

/// Prompt asking whether the narrative matches the detected damage
pub fn consistency_prompt<S: AsRef<str>>(description: &str, labels: &[S]) -> String {
    format!(
        "\nA user submitted a car insurance claim.\n\n\
         Description: \"{description}\"\n\
         Detected damage types from image analysis: [{labels}]\n\n\
         Does the description align with the actual detected damage? \
         If not, explain what appears to be inaccurate or exaggerated.",
        description = description,
        labels = join_labels(labels),
    )
}

/// Prompt asking for a short summary of the adjudicated claim
pub fn summary_prompt<S: AsRef<str>>(
    description: &str,
    labels: &[S],
    tier: PolicyTier,
    payout: Payout,
) -> String {
    format!(
        "Summarize this car insurance claim:\n\
         Description: {description}\n\
         Detected damage: {labels}\n\
         Policy: {tier}\n\
         Estimated payout: {payout}",
        description = description,
        labels = join_labels(labels),
        tier = tier,
        payout = payout,
    )
}

fn join_labels<S: AsRef<str>>(labels: &[S]) -> String {
    labels
        .iter()
        .map(|l| l.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

//! System prompt assembly from the bot persona

use crate::db::{AutomationRule, BotSettings};

const DEFAULT_NAME: &str = "Herald";

/// Build the system prompt for an AI reply
///
/// Known automation triggers are listed so the model points users at them
/// instead of improvising a different answer.
#[must_use]
pub fn system_prompt(settings: &BotSettings, automations: &[AutomationRule]) -> String {
    let name = or_default(&settings.bot_name, DEFAULT_NAME);
    let mut sections = vec![format!(
        "You are {name}, the virtual assistant for this business."
    )];

    if !settings.ai_summary.trim().is_empty() {
        sections.push(format!("Background:\n{}", settings.ai_summary.trim()));
    }

    sections.push(
        [
            format!("Mission: {}", or_default(&settings.company_mission, "not specified")),
            format!("Audience: {}", or_default(&settings.target_audience, "general public")),
            format!(
                "Products and services: {}",
                or_default(&settings.main_products, "not specified")
            ),
            format!("Niche: {}", or_default(&settings.niche, "general")),
            format!("Tone: {}", or_default(&settings.tone, "professional")),
            format!(
                "Never discuss: {}",
                or_default(&settings.do_not_discuss, "nothing restricted")
            ),
        ]
        .join("\n"),
    );

    let commands = command_list(automations);
    if commands.is_empty() {
        sections.push("There are no bot commands.".to_string());
    } else {
        sections.push(format!("Bot commands users can send: {}", commands.join(", ")));
    }

    if settings.auto_attendance && !commands.is_empty() {
        sections.push(
            "When a question is already covered by a command, answer it and mention the command."
                .to_string(),
        );
    }

    sections.push(format!(
        "Reply briefly and in the user's language. If asked who you are, you are {name}. \
         Do not mention the systems you run on."
    ));

    sections.join("\n\n")
}

/// Triggers rendered as `/command`, deduplicated in rule order
fn command_list(automations: &[AutomationRule]) -> Vec<String> {
    let mut commands: Vec<String> = Vec::new();
    for rule in automations.iter().filter(|r| r.active) {
        let trigger = rule.trigger.trim().trim_start_matches('/');
        if trigger.is_empty() {
            continue;
        }
        let command = format!("/{trigger}");
        if !commands.contains(&command) {
            commands.push(command);
        }
    }
    commands
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() { default } else { value }
}

//! Guided workflow prompts
//!
//! Each prompt renders a short conversation that steers the agent towards the
//! tools and resources relevant to the task.

use crate::error::{HassError, Result};
use pulseengine_mcp_protocol::{
    GetPromptRequestParam, GetPromptResult, Prompt, PromptArgument, PromptMessage,
    PromptMessageRole,
};
use std::collections::HashMap;
use tracing::debug;

fn argument(name: &str, description: &str, required: bool) -> PromptArgument {
    PromptArgument {
        name: name.to_string(),
        description: Some(description.to_string()),
        required: Some(required),
    }
}

fn prompt(name: &str, description: &str, arguments: Vec<PromptArgument>) -> Prompt {
    Prompt {
        name: name.to_string(),
        description: Some(description.to_string()),
        arguments: if arguments.is_empty() {
            None
        } else {
            Some(arguments)
        },
    }
}

/// All prompts offered by the server
pub fn all_prompts() -> Vec<Prompt> {
    vec![
        prompt(
            "create_automation",
            "Design a new automation from a plain-language goal",
            vec![
                argument("goal", "What the automation should achieve", true),
                argument(
                    "entities",
                    "Comma-separated entity ids to build around",
                    false,
                ),
            ],
        ),
        prompt(
            "debug_automation",
            "Find out why an automation does not behave as expected",
            vec![argument("automation_id", "Automation entity id or config id", true)],
        ),
        prompt(
            "troubleshoot_entity",
            "Diagnose an entity that is unavailable or reporting odd values",
            vec![argument("entity_id", "Entity to troubleshoot", true)],
        ),
        prompt(
            "routine_optimizer",
            "Review logbook patterns and propose routines worth automating",
            vec![],
        ),
        prompt(
            "automation_health_check",
            "Audit every automation for errors, stale triggers and deprecated syntax",
            vec![],
        ),
        prompt(
            "entity_naming_consistency",
            "Check entity ids and friendly names for a consistent naming scheme",
            vec![argument("domain", "Only review this domain", false)],
        ),
        prompt(
            "dashboard_layout_generator",
            "Propose a Lovelace dashboard layout grouped by room",
            vec![argument(
                "focus",
                "What the dashboard is for, e.g. energy, security or overview",
                false,
            )],
        ),
        prompt(
            "migrate_deprecated_config",
            "Rewrite configuration that uses deprecated syntax",
            vec![argument("content", "YAML to migrate", false)],
        ),
        prompt(
            "home_anomaly_review",
            "Walk through current anomalies and decide what needs attention",
            vec![argument(
                "min_severity",
                "Lowest severity to review: info, warning or critical",
                false,
            )],
        ),
    ]
}

fn optional<'a>(args: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    args.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn required<'a>(
    args: &'a HashMap<String, String>,
    prompt: &str,
    name: &str,
) -> Result<&'a str> {
    optional(args, name).ok_or_else(|| {
        HassError::invalid_input(format!("Prompt '{prompt}' requires argument '{name}'"))
    })
}

fn user(text: impl Into<String>) -> PromptMessage {
    PromptMessage::new_text(PromptMessageRole::User, text)
}

fn assistant(text: impl Into<String>) -> PromptMessage {
    PromptMessage::new_text(PromptMessageRole::Assistant, text)
}

/// Render a prompt by name
pub fn get_prompt(params: GetPromptRequestParam) -> Result<GetPromptResult> {
    debug!("Rendering prompt {}", params.name);
    let args = params.arguments.unwrap_or_default();
    let name = params.name.as_str();

    let (description, messages) = match name {
        "create_automation" => {
            let goal = required(&args, name, "goal")?;
            let scope = match optional(&args, "entities") {
                Some(entities) => format!("Build it around these entities: {entities}."),
                None => "Use search_entities to find the entities involved.".to_string(),
            };
            (
                "Design a new automation",
                vec![
                    user(format!(
                        "I want an automation that does the following: {goal}. {scope}"
                    )),
                    assistant(
                        "I will confirm each entity with get_entity, check the available \
                         services with list_services, then write the automation in current \
                         YAML syntax (triggers/conditions/actions with trigger: and action: \
                         keys). I will run check_deprecations on the draft before handing it over.",
                    ),
                ],
            )
        }
        "debug_automation" => {
            let automation_id = required(&args, name, "automation_id")?;
            (
                "Debug an automation",
                vec![
                    user(format!(
                        "The automation {automation_id} does not work as expected. Find out why."
                    )),
                    assistant(format!(
                        "Plan: read {automation_id} with get_entity to see its state and \
                         last_triggered, look at get_logbook and get_history for the window \
                         when it should have fired, scan get_error_log for related errors, \
                         and run check_deprecations on its configuration."
                    )),
                ],
            )
        }
        "troubleshoot_entity" => {
            let entity_id = required(&args, name, "entity_id")?;
            (
                "Troubleshoot an entity",
                vec![
                    user(format!("Help me troubleshoot {entity_id}.")),
                    assistant(format!(
                        "I will fetch {entity_id} with get_entity (detailed), review its last \
                         24 hours through get_history, check detect_anomalies for findings on \
                         it, look for entities on the same device with find_related_entities, \
                         and search get_error_log for its integration."
                    )),
                ],
            )
        }
        "routine_optimizer" => (
            "Find routines worth automating",
            vec![
                user(
                    "Look at how the house is actually used and suggest routines I should \
                     automate.",
                ),
                assistant(
                    "I will read get_logbook over the last week to find repeated manual \
                     actions, compare them with list_automations, and combine the result \
                     with suggest_automations. Each proposal will name its trigger, \
                     conditions and actions.",
                ),
            ],
        ),
        "automation_health_check" => (
            "Audit all automations",
            vec![
                user("Check the health of all my automations."),
                assistant(
                    "I will list them with list_automations, flag any that are off or \
                     have never triggered, run check_deprecations on each configuration, \
                     run check_config, and summarize related entries from get_error_log.",
                ),
            ],
        ),
        "entity_naming_consistency" => {
            let scope = match optional(&args, "domain") {
                Some(domain) => format!("the {domain} domain"),
                None => "all domains".to_string(),
            };
            (
                "Review entity naming",
                vec![
                    user(format!(
                        "Review entity ids and friendly names in {scope} for consistency."
                    )),
                    assistant(
                        "I will page through list_entities, group names by room with \
                         find_related_entities, and point out ids that break the \
                         room_device_measurement pattern, duplicated friendly names and \
                         leftover default names. Each finding will come with a proposed rename.",
                    ),
                ],
            )
        }
        "dashboard_layout_generator" => {
            let focus = optional(&args, "focus").unwrap_or("overview");
            (
                "Generate a dashboard layout",
                vec![
                    user(format!("Design a dashboard with a focus on {focus}.")),
                    assistant(
                        "I will read the hass://entities resource, group entities by room \
                         using find_related_entities, and produce a Lovelace YAML layout \
                         with one view per area. Each card type will be chosen by domain \
                         and device class.",
                    ),
                ],
            )
        }
        "migrate_deprecated_config" => {
            let request = match optional(&args, "content") {
                Some(content) => format!(
                    "Migrate this configuration to current syntax:\n\n```yaml\n{content}\n```"
                ),
                None => "Find and migrate deprecated syntax in my automations.".to_string(),
            };
            (
                "Migrate deprecated configuration",
                vec![
                    user(request),
                    assistant(
                        "I will run check_deprecations and apply each suggested replacement. \
                         Without content I will go through list_automations and check every \
                         automation by id. The migrated YAML will be checked again before I \
                         return it.",
                    ),
                ],
            )
        }
        "home_anomaly_review" => {
            let min_severity = optional(&args, "min_severity").unwrap_or("warning");
            (
                "Review home anomalies",
                vec![
                    user(format!(
                        "Review everything unusual in the house at severity {min_severity} \
                         or higher."
                    )),
                    assistant(format!(
                        "I will call detect_anomalies with min_severity {min_severity}, \
                         use get_history to tell lasting problems from glitches, and use \
                         find_related_entities to spot devices failing together. Findings \
                         will be ordered by severity with a next step for each."
                    )),
                ],
            )
        }
        _ => return Err(HassError::not_found(format!("Prompt not found: {name}"))),
    };

    Ok(GetPromptResult {
        description: Some(description.to_string()),
        messages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(name: &str, args: &[(&str, &str)]) -> GetPromptRequestParam {
        GetPromptRequestParam {
            name: name.to_string(),
            arguments: Some(
                args.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        }
    }

    fn text(message: &PromptMessage) -> String {
        let value = serde_json::to_value(message).unwrap();
        value["content"]["text"].as_str().unwrap_or_default().to_string()
    }

    fn role(message: &PromptMessage) -> String {
        let value = serde_json::to_value(message).unwrap();
        value["role"].as_str().unwrap_or_default().to_string()
    }

    #[test]
    fn test_every_listed_prompt_renders() {
        for prompt in all_prompts() {
            let args: Vec<(&str, &str)> = prompt
                .arguments
                .iter()
                .flatten()
                .map(|a| (a.name.as_str(), "x"))
                .collect();
            let result = get_prompt(params(&prompt.name, &args)).unwrap();
            assert!(!result.messages.is_empty(), "{} rendered nothing", prompt.name);
        }
    }

    #[test]
    fn test_missing_required_argument() {
        let err = get_prompt(params("troubleshoot_entity", &[])).unwrap_err();
        assert!(matches!(err, HassError::InvalidInput(_)));

        let err = get_prompt(params("create_automation", &[("goal", "  ")])).unwrap_err();
        assert!(matches!(err, HassError::InvalidInput(_)));
    }

    #[test]
    fn test_arguments_are_interpolated() {
        let result = get_prompt(params("troubleshoot_entity", &[("entity_id", "sensor.attic")]))
            .unwrap();
        assert_eq!(role(&result.messages[0]), "user");
        assert!(text(&result.messages[0]).contains("sensor.attic"));
        assert!(text(&result.messages[1]).contains("get_history"));
    }

    #[test]
    fn test_unknown_prompt() {
        let err = get_prompt(params("nope", &[])).unwrap_err();
        assert!(matches!(err, HassError::NotFound(_)));
    }
}

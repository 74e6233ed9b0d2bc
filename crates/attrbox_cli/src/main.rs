//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `attrbox_core` linkage with one sample container.
//! - Print its projection and evaluate a filter expression from argv.
//!
//! Usage: `attrbox_cli [EXPRESSION]`. Set `ATTRBOX_LOG_DIR` to an absolute
//! path to enable file logging.

use attrbox_core::{
    default_log_level, init_logging, AttributeContainer, AttributeValue, Identifier,
    IdentifierSlot,
};
use std::process::ExitCode;

const LOG_DIR_ENV: &str = "ATTRBOX_LOG_DIR";
const DEFAULT_EXPRESSION: &str = r#"label == "browser_search""#;

/// Sample record tagging one event with a label.
struct EventTag {
    identifier: IdentifierSlot,
    event_row_identifier: Option<Identifier>,
    label: String,
    comment: Option<String>,
}

impl AttributeContainer for EventTag {
    const CONTAINER_TYPE: &'static str = "event_tag";
    const ATTRIBUTE_NAMES: &'static [&'static str] = &["_event_row_identifier", "comment", "label"];
    const SCHEMA: &'static [(&'static str, &'static str)] = &[
        ("_event_row_identifier", "AttributeContainerIdentifier"),
        ("comment", "str"),
        ("label", "str"),
    ];
    const SERIALIZABLE_PROTECTED_ATTRIBUTES: &'static [&'static str] = &["_event_row_identifier"];

    fn attribute_value(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "_event_row_identifier" => Some(self.event_row_identifier.clone().into()),
            "comment" => Some(self.comment.clone().into()),
            "label" => Some(self.label.as_str().into()),
            _ => None,
        }
    }

    fn identifier_slot(&self) -> &IdentifierSlot {
        &self.identifier
    }

    fn identifier_slot_mut(&mut self) -> &mut IdentifierSlot {
        &mut self.identifier
    }
}

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("attrbox_cli logging disabled: {err}");
        }
    }

    let expression = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_EXPRESSION.to_string());

    let tag = EventTag {
        identifier: IdentifierSlot::new(),
        event_row_identifier: Some(Identifier::with_sequence("event", 1)),
        label: "browser_search".to_string(),
        comment: None,
    };

    let dict = match serde_json::to_string(&tag.copy_to_dict()) {
        Ok(json) => json,
        Err(err) => {
            eprintln!("attrbox_cli failed to encode container: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("attrbox_core version={}", attrbox_core::core_version());
    println!("container_type={}", tag.container_type());
    println!("identifier={}", tag.identifier());
    println!("dict={dict}");
    println!("values={}", tag.attribute_values_string());
    println!("hash={:016x}", tag.attribute_values_hash());
    println!("matches={}", tag.matches_expression(&expression));
    log::info!("event=cli_smoke module=cli status=ok");

    ExitCode::SUCCESS
}

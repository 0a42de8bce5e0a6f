//! Local conversation driver.
//!
//! Each input line is one user message, either as JSON
//! (`{"intent": "ask_price", "entities": {"product_name": "sme"}}`) or as a
//! button payload (`/inform{"training":"onsite"}`). Blank lines and lines
//! starting with `#` are skipped.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use dealbot_agent::{ActionContext, DialogRuntime, InMemoryTracker, UserMessage};
use dealbot_core::config::{AppConfig, LoadOptions};
use dealbot_core::domain::dialog::Utterance;
use serde_json::{Map, Value};

use super::CommandResult;

pub fn run(sender: &str, input: Option<&Path>) -> CommandResult {
    match run_inner(sender, input) {
        Ok(turns) => CommandResult::text(0, format!("chat finished after {turns} turns")),
        Err(error) => CommandResult::failure("chat", "runtime", format!("{error:#}"), 5),
    }
}

fn run_inner(sender: &str, input: Option<&Path>) -> Result<usize> {
    let config = AppConfig::load(LoadOptions::default())?;
    let runtime = DialogRuntime::standard(ActionContext::load(&config)?);
    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("could not open `{}`", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let executor = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")?;
    executor.block_on(converse(&runtime, sender, reader, io::stdout().lock()))
}

/// Feeds every message to the runtime and writes the bot's replies. Returns
/// the number of turns handled.
pub async fn converse<R: BufRead, W: Write>(
    runtime: &DialogRuntime,
    sender: &str,
    reader: R,
    mut writer: W,
) -> Result<usize> {
    let mut tracker = InMemoryTracker::new(sender);
    let mut turns = 0;

    for line in reader.lines() {
        let line = line.context("failed to read input")?;
        let message = match parse_line(&line) {
            Ok(Some(message)) => message,
            Ok(None) => continue,
            Err(error) => {
                writeln!(writer, "! {error:#}")?;
                continue;
            }
        };

        turns += 1;
        writeln!(writer, "> {}", message.intent.as_deref().unwrap_or("<none>"))?;
        let correlation_id = format!("{sender}-{turns}");
        match runtime.handle(&mut tracker, message, &correlation_id).await {
            Ok(responses) => {
                for utterance in &responses {
                    writeln!(writer, "{}", render_utterance(utterance))?;
                }
            }
            Err(error) => writeln!(writer, "! {error}")?,
        }
    }

    writer.flush()?;
    Ok(turns)
}

pub fn parse_line(line: &str) -> Result<Option<UserMessage>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    if let Some(payload) = line.strip_prefix('/') {
        return parse_payload(payload).map(Some);
    }
    serde_json::from_str(line).map(Some).context("expected a JSON message or a /intent payload")
}

fn parse_payload(payload: &str) -> Result<UserMessage> {
    let (intent, raw_entities) = match payload.find('{') {
        Some(index) => payload.split_at(index),
        None => (payload, ""),
    };
    if intent.is_empty() {
        bail!("payload `/{payload}` has no intent");
    }

    let mut message = UserMessage::new(intent);
    if raw_entities.is_empty() {
        return Ok(message);
    }
    let entities: Map<String, Value> = serde_json::from_str(raw_entities)
        .with_context(|| format!("entities of `/{payload}` are not a JSON object"))?;
    for (entity, value) in entities {
        let value = match value {
            Value::String(text) => text,
            Value::Null => continue,
            other => other.to_string(),
        };
        message = message.with_entity(entity, value);
    }
    Ok(message)
}

fn render_utterance(utterance: &Utterance) -> String {
    match utterance {
        Utterance::Template { name, slots } => {
            let filled: Vec<String> = slots
                .iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(slot, value)| match value {
                    Value::String(text) => format!("{slot}={text}"),
                    other => format!("{slot}={other}"),
                })
                .collect();
            if filled.is_empty() {
                format!("[{name}]")
            } else {
                format!("[{name}] {}", filled.join(" "))
            }
        }
        Utterance::Text { text } => text.clone(),
        Utterance::Buttons { text, buttons } => {
            let mut lines = vec![text.clone()];
            lines.extend(
                buttons.iter().map(|button| format!("  - {} ({})", button.title, button.payload)),
            );
            lines.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;

    use dealbot_agent::{ActionContext, DialogRuntime, UserMessage};
    use dealbot_core::audit::InMemoryAuditSink;
    use dealbot_core::cpq::Catalog;
    use dealbot_core::data::DialogData;
    use dealbot_core::domain::dialog::{Button, Utterance};
    use dealbot_core::mapping::MappingTables;
    use dealbot_core::session::{Clock, InMemorySessionStore, SystemClock};

    use super::{converse, parse_line, render_utterance};

    fn runtime() -> DialogRuntime {
        let catalog = Catalog::from_reader(
            "product_name,package,scope_threshold,price,renewal_price\n\
             sme,standard,11,9950000,2000000\n\
             sme,professional,13,12450000,2500000\n\
             sme,enterprise,16,16950000,3000000\n"
                .as_bytes(),
            Path::new("catalog.csv"),
        )
        .expect("catalog parses");
        let mappings = MappingTables::from_parts(
            HashMap::from([("trading company".to_string(), "professional".to_string())]),
            HashMap::from([("sme.net".to_string(), "sme".to_string())]),
            HashMap::new(),
        )
        .expect("mappings build");
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        DialogRuntime::standard(ActionContext::new(
            Arc::new(DialogData::new(catalog, mappings)),
            Arc::new(InMemorySessionStore::with_ttl_secs(3000, clock.clone())),
            clock,
            Arc::new(InMemoryAuditSink::default()),
        ))
    }

    #[test]
    fn payload_lines_become_messages() {
        let message = parse_line(r#"/inform{"training": "onsite", "scope": 13}"#)
            .expect("parses")
            .expect("not skipped");

        assert_eq!(
            message,
            UserMessage::new("inform").with_entity("training", "onsite").with_entity("scope", "13")
        );
        assert_eq!(parse_line("/deny").expect("parses"), Some(UserMessage::new("deny")));
    }

    #[test]
    fn json_lines_and_comments() {
        let message = parse_line(r#"{"intent": "ask_price", "entities": {"product_name": "sme"}}"#)
            .expect("parses")
            .expect("not skipped");
        assert_eq!(message, UserMessage::new("ask_price").with_entity("product_name", "sme"));

        assert_eq!(parse_line("   ").expect("blank"), None);
        assert_eq!(parse_line("# greeting").expect("comment"), None);
        assert!(parse_line("hello there").is_err());
        assert!(parse_line(r#"/{"a":"b"}"#).is_err());
    }

    #[test]
    fn buttons_render_with_payloads() {
        let rendered = render_utterance(&Utterance::buttons(
            "Did you want to ask about prices?",
            vec![Button::new("Yes", "/ask_price"), Button::new("No", "/out_of_scope")],
        ));

        assert_eq!(
            rendered,
            "Did you want to ask about prices?\n  - Yes (/ask_price)\n  - No (/out_of_scope)"
        );
    }

    #[tokio::test]
    async fn transcript_walks_the_form_to_a_price() {
        let input = "\
/ask_price{\"product_name\": \"sme.net\"}
# the bot asks for the organization next
/inform{\"organization_field\": \"trading company\"}
not a message
";
        let mut output = Vec::new();

        let turns =
            converse(&runtime(), "tester", input.as_bytes(), &mut output).await.expect("converses");

        let transcript = String::from_utf8(output).expect("utf8");
        assert_eq!(turns, 2);
        assert!(transcript.starts_with("> ask_price\n[utter_ask_organization_field]"));
        assert!(transcript.contains("> inform\n"));
        assert!(transcript.contains("package=professional"));
        assert!(transcript.lines().last().unwrap_or_default().starts_with("! "));
    }
}

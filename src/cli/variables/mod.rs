//! Variables command - inspects a template without touching storage

use std::path::Path;

use anyhow::Context;
use clap::Args;

use crate::domain::prompt::PromptTemplate;

#[derive(Args, Clone, Debug)]
pub struct VariablesArgs {
    /// Template file, or the template text itself when no such file exists.
    /// JSON arrays of `{"role", "content"}` objects are read as chat templates.
    pub template: String,

    /// Also print the template with `{{ x }}` rewritten to `{x}`
    #[arg(long)]
    pub single_brace: bool,
}

pub async fn run(args: VariablesArgs) -> anyhow::Result<()> {
    let template = load_template(&args.template)?;

    for variable in template.variables() {
        println!("{}", variable);
    }

    if args.single_brace {
        println!();
        println!("{}", serde_json::to_string_pretty(&template.to_single_brace_format())?);
    }

    Ok(())
}

fn load_template(source: &str) -> anyhow::Result<PromptTemplate> {
    let path = Path::new(source);

    let content = if path.is_file() {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template file {}", path.display()))?
    } else {
        source.to_string()
    };

    Ok(parse_template(content))
}

fn parse_template(content: String) -> PromptTemplate {
    if content.trim_start().starts_with('[') {
        let parsed = serde_json::from_str::<PromptTemplate>(&content);

        if let Ok(template @ PromptTemplate::Chat(_)) = parsed {
            return template;
        }
    }

    PromptTemplate::Text(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_template() {
        let template = parse_template("Hello {{ name }}".to_string());
        assert_eq!(template, PromptTemplate::Text("Hello {{ name }}".to_string()));
        assert_eq!(template.variables(), vec!["name".to_string()]);
    }

    #[test]
    fn test_parse_chat_template() {
        let template = parse_template(
            r#"[{"role": "system", "content": "Be {{ tone }}"}, {"role": "user", "content": "{{ q }}"}]"#
                .to_string(),
        );

        assert!(matches!(template, PromptTemplate::Chat(ref m) if m.len() == 2));
        assert_eq!(template.variables(), vec!["tone".to_string(), "q".to_string()]);
    }

    #[test]
    fn test_bracketed_text_stays_text() {
        let template = parse_template("[draft] {{ title }}".to_string());
        assert!(matches!(template, PromptTemplate::Text(_)));
    }

    #[test]
    fn test_load_literal_when_no_file() {
        let template = load_template("no/such/file {{ x }}").unwrap();
        assert_eq!(template.variables(), vec!["x".to_string()]);
    }
}

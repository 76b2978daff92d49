use crate::tools::ToolSpec;

const REPLY_FORMAT: &str = r#"Follow this conversation pattern:
1. Always provide helpful output to the user
2. If you need tools, call them to gather information
3. Continue until the task is complete

When responding, use this exact JSON format:
{
  "output": "Your helpful response to the user",
  "tool_calls": [
    {
      "name": "tool_name",
      "parameters": { "param": "value" }
    }
  ]
}

If no tools are needed, omit the tool_calls array:
{
  "output": "Your direct answer"
}

Be conversational and helpful. Explain what you're doing when using tools."#;

/// System message sent ahead of the conversation on every round.
pub fn build_preamble(intro: &str, tools: &[ToolSpec]) -> String {
    let catalog = tools
        .iter()
        .map(|t| format!("- {}: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{}\n\nYou have access to these tools:\n{}\n\n{}",
        intro.trim(),
        catalog,
        REPLY_FORMAT
    )
}

//! System prompts for each stage of a run.

use crate::tools::{ToolCatalog, ToolCategory};
use std::fmt::Write;

/// Used when no tool category is configured.
pub const DIRECT_PROMPT: &str = "You are a helpful workplace assistant answering messages in a team chat. \
Answer the user's message directly and concisely. You have no tools available.";

const SELECTION_PREAMBLE: &str = "You route chat messages to tool categories. \
Decide which of the categories below are needed to fulfil the user's latest message. \
Select every category whose tools are required. \
If the message can be answered without any tools, select only NONE and write the full reply in direct_answer. \
Always explain your choice in rationale.";

const PLANNING_PREAMBLE: &str = "You plan how to fulfil the user's latest message with the tools below. \
Produce an ordered list of steps. A tool step names exactly one of the listed tools and its arguments. \
A reason step records a thought that needs no tool. \
Only use tools from the list. An empty plan is fine when no step is needed.";

const EXECUTION_PREAMBLE: &str = "You are a helpful workplace assistant answering messages in a team chat. \
Use the available tools to fulfil the user's request, then reply with a concise final answer. \
If a tool fails, use the error to adjust or explain the problem to the user.";

const MULTI_STEP_PREAMBLE: &str = "You are a helpful workplace assistant answering messages in a team chat. \
The request spans several tool categories. Work through the plan below step by step, \
using the tool results of earlier steps to fill in later arguments. \
The plan is guidance: skip or adjust steps when results show they are unnecessary. \
When every step is done, reply with a concise final answer.";

/// Prompt for the category selector.
pub fn selection(categories: &[ToolCategory]) -> String {
    let mut prompt = format!("{SELECTION_PREAMBLE}\n\nCategories:\n");
    for category in categories {
        let _ = writeln!(prompt, "- {}: {}", category.key, category.selection_prompt);
    }
    prompt
}

/// Prompt for the plan generator.
pub fn planning(catalog: &ToolCatalog, instructions: &[String]) -> String {
    let mut prompt = format!("{PLANNING_PREAMBLE}\n\nTools:\n");
    for tool in catalog.descriptors() {
        let _ = writeln!(
            prompt,
            "- {}: {}\n  parameters: {}",
            tool.name, tool.description, tool.parameters
        );
    }
    push_instructions(&mut prompt, instructions);
    prompt
}

/// Execution prompt when one category was selected.
pub fn single_category(instructions: &[String], plan: &str) -> String {
    let mut prompt = EXECUTION_PREAMBLE.to_string();
    if !plan.is_empty() {
        let _ = write!(prompt, "\n\nSuggested approach:\n{plan}");
    }
    push_instructions(&mut prompt, instructions);
    prompt
}

/// Execution prompt when several categories were selected.
pub fn multi_step(instructions: &[String], plan: &str) -> String {
    let mut prompt = MULTI_STEP_PREAMBLE.to_string();
    let plan = if plan.is_empty() { "(no steps)" } else { plan };
    let _ = write!(prompt, "\n\nPlan:\n{plan}");
    push_instructions(&mut prompt, instructions);
    prompt
}

fn push_instructions(prompt: &mut String, instructions: &[String]) {
    let mut lines = instructions.iter().filter(|i| !i.trim().is_empty()).peekable();
    if lines.peek().is_none() {
        return;
    }
    prompt.push_str("\n\nInstructions:\n");
    for line in lines {
        let _ = writeln!(prompt, "- {}", line.trim());
    }
}

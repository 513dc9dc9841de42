//! Prompt Builders
//!
//! Every system prompt and user message sent to the completion service.
//! Builders are pure functions so tests can assert on what a stage asks for.

use crate::models::dsl::vocabulary_listing;
use crate::models::rule::{Platform, RuleDescription};
use crate::services::decomposer::DecompositionStep;

// ============================================================================
// Decomposition
// ============================================================================

/// Seed of the reasoning history.
pub fn build_reasoning_background(description: &RuleDescription) -> String {
    format!(
        "You are a senior detection engineer who writes {platform} detection rules.\n\
         We will design a rule step by step. At each step, reason only about the \
         question asked and keep the answer short and concrete. Do not write the \
         final query.\n\n\
         The rule to design:\n{description}",
        platform = description.platform.display_name(),
        description = description.text
    )
}

/// Question asked of the reasoning history for one step.
pub fn step_instruction(step: DecompositionStep) -> &'static str {
    match step {
        DecompositionStep::UnderstandingProblem => {
            "Step 1 - Understanding the problem: what behaviour must this rule detect, \
             and what would a true positive look like?"
        }
        DecompositionStep::IdentifyDataSource => {
            "Step 2 - Identify the data source: which index, source type, table or log \
             source contains the events needed?"
        }
        DecompositionStep::DefineInitialFilters => {
            "Step 3 - Define the initial filters: which conditions narrow the data down \
             to the relevant events as early as possible?"
        }
        DecompositionStep::ExtractRelevantFields => {
            "Step 4 - Extract the relevant fields: which fields must be extracted, parsed \
             or renamed for the detection?"
        }
        DecompositionStep::PerformDataAggregation => {
            "Step 5 - Perform data aggregation: how should events be grouped and counted \
             or summarised?"
        }
        DecompositionStep::CalculateDerivedMetrics => {
            "Step 6 - Calculate derived metrics: which ratios, durations, thresholds or \
             other computed values are needed?"
        }
        DecompositionStep::FilterAnomalies => {
            "Step 7 - Filter anomalies: which conditions on the aggregated or derived \
             values separate suspicious activity from normal activity?"
        }
        DecompositionStep::OptimizeOutput => {
            "Step 8 - Optimize the output: which fields should be kept, how should results \
             be sorted or deduplicated, and how should they be presented?"
        }
    }
}

/// Seed of the emission history: the DSL contract plus optional context.
pub fn build_dsl_generation_prompt(description: &RuleDescription) -> String {
    let mut prompt = format!(
        "You translate the reasoning of a detection engineer into a DSL that \
         describes a {platform} detection rule.\n\n\
         Rule description:\n{text}\n\n\
         Each DSL statement is one line that starts with one of these keywords:\n\
         {keywords}\n\n\
         For every message you receive, write only the statements that the given \
         step contributes, one per line, inside a ```plaintext code block. If the \
         step contributes nothing, return an empty ```plaintext block.",
        platform = description.platform.display_name(),
        text = description.text,
        keywords = vocabulary_listing()
    );
    if let Some(fields) = &description.required_fields {
        prompt.push_str(&format!("\nBelow are the required fields:\n{}", fields));
    }
    if let Some(log) = &description.sample_log {
        prompt.push_str(&format!("\nBelow is a demo log:\n{}", log));
    }
    prompt
}

/// Emission-history turn carrying one step's reasoning.
pub fn build_step_message(step: DecompositionStep, reasoning: &str) -> String {
    format!("{}:\n{}", step.label(), reasoning)
}

// ============================================================================
// Optimization & Rendering
// ============================================================================

pub fn build_dsl_optimize_prompt() -> String {
    format!(
        "You review DSL programs that describe detection rules. The statements were \
         written step by step and may repeat, contradict or miss each other.\n\
         Merge duplicates, drop statements that do not serve the description, order \
         the statements so that they can be executed top to bottom, and keep one \
         statement per line.\n\n\
         Allowed keywords:\n{}\n\n\
         Return the final program inside a ```plaintext code block.",
        vocabulary_listing()
    )
}

pub fn build_dsl_optimize_message(draft: &str, description: &str) -> String {
    format!("## DSL Rules:\n{}\n\n## Rule Description:\n{}", draft, description)
}

pub fn build_render_prompt(description: &RuleDescription) -> String {
    let mut prompt = format!(
        "You are an expert in {platform} query languages. Convert the DSL program \
         into a single {platform} detection query that implements the rule \
         description.\n\n\
         The DSL keywords mean:\n{keywords}",
        platform = description.platform.display_name(),
        keywords = vocabulary_listing()
    );
    if let Some(fields) = &description.required_fields {
        prompt.push_str(&format!("\n## Below are the required fields:\n{}", fields));
    }
    prompt
}

pub fn build_render_message(dsl: &str, description: &str) -> String {
    format!("## DSL Rule:\n{} \n\n ## Rule Description:\n{}", dsl, description)
}

pub fn build_simple_generation_prompt(platform: Platform) -> String {
    format!(
        "You are an expert detection engineer. Write a {} detection query that \
         implements the rule description. Return the query inside a ```{} code \
         block.",
        platform.display_name(),
        platform.fence_tag()
    )
}

pub fn build_simple_generation_message(description: &RuleDescription) -> String {
    format!(
        "The following is the {} rule description:\n{}\nThe following are the required fields:\n{}",
        description.platform.display_name(),
        description.text,
        description.required_fields.as_deref().unwrap_or("None")
    )
}

// ============================================================================
// Reflection & Repair
// ============================================================================

pub fn build_score_prompt(query: &str, description: &str) -> String {
    format!(
        "You review security detection rules. Rate the rule below against its \
         description on three dimensions, each between 0 and 1:\n\
         - logical_coherence: does the rule implement what the description asks for?\n\
         - syntax_validation: is the rule grammatical for its query language?\n\
         - execution_feasibility: would the rule run and return results on real data?\n\n\
         Reply with a JSON object with the keys \"logical_coherence\", \
         \"syntax_validation\", \"execution_feasibility\" (numbers) and \"comment\" \
         (a short explanation).\n\n\
         ## Rule:\n{}\n\n## Description:\n{}",
        query, description
    )
}

/// System prompt for rewrite calls, both repair and polish.
pub fn build_rule_optimize_prompt(platform: Platform) -> String {
    format!(
        "You are an expert in {platform} detection rules. Improve the rule so that it \
         is correct, runs efficiently and matches its description. Use any feedback \
         provided. Return only the improved rule inside a ```{fence} code block.",
        platform = platform.display_name(),
        fence = platform.fence_tag()
    )
}

pub fn build_polish_message(query: &str, description: &str) -> String {
    format!(
        "The following is the rule to be optimized:\n{}\nThe following is the description of the rule:\n{}",
        query, description
    )
}

/// Rewrite request carrying one dimension's feedback.
pub fn build_repair_message(
    query: &str,
    description: &str,
    feedback_source: &str,
    feedback: &str,
) -> String {
    format!(
        "The following is the rule to be optimized:\n{}\n\
         The following is the description of the rule:\n{}\n\
         The following is the feedback from {}:\n{}",
        query, description, feedback_source, feedback
    )
}

// ============================================================================
// Conversion
// ============================================================================

pub fn build_classification_prompt() -> String {
    format!(
        "You analyse one segment of a detection query at a time. Identify the \
         operation the segment performs, the fields it reads and the fields it \
         produces.\n\n\
         Operation types:\n{}\n\n\
         Reply with a JSON object: {{\"operation_type\": <one keyword>, \
         \"input_fields\": [<field names>], \"output_fields\": [<field names>]}}.",
        vocabulary_listing()
    )
}

pub fn build_classification_message(platform: Platform, segment: &str) -> String {
    format!(
        "The following is a part of a {} rule:\n{}",
        platform.display_name(),
        segment
    )
}

pub fn build_conversion_prompt(target: Platform) -> String {
    format!(
        "You convert detection rules to {target}. You will receive the source rule \
         one segment at a time, in order. Convert each segment into the equivalent \
         {target} segment, consistent with the segments converted so far. Do not \
         include the segment separator.\n\n\
         Reply with a JSON object: {{\"result\": <converted segment>}}.",
        target = target.display_name()
    )
}

pub fn build_conversion_message(source: Platform, segment: &str, operation: Option<&str>) -> String {
    format!(
        "The following is a part of a {} rule:\n{}\nThe operation type is {}",
        source.display_name(),
        segment,
        operation.unwrap_or("unknown")
    )
}

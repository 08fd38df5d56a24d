// src/research/prompts.rs — Stage prompts and output schemas

use crate::corpus::Document;
use crate::research::types::AnalyzedDocument;

/// System message for query generation. Later iterations append the
/// follow-up section asking the model to steer away from earlier queries —
/// a prompt-level hint, not an enforced filter.
pub fn query_generation_system(
    max_queries: usize,
    previous_queries: &[String],
    considerations: &[String],
    first_iteration: bool,
) -> String {
    let mut system = format!(
        "You are a research assistant working over a private document collection.\n\
         \n\
         An expert asks you one or more questions and needs a thorough investigation.\n\
         Your task is to formulate {max_queries} precise and diverse search queries the \
         expert can run against a combined semantic-lexical search engine to find \
         relevant documents.\n\
         \n\
         Guidelines:\n\
         - Queries may be keywords, broad synonyms, or complete sentences.\n\
         - Together the queries should cover every relevant aspect of the question.\n\
         - For a broad topic, split it into queries for each sub-aspect.\n\
         - Each query should target one specific aspect of the original question.\n\
         - Do not produce near-duplicate queries; one is enough."
    );

    if !first_iteration {
        system.push_str(&format!(
            "\n\nThe following queries were already issued in earlier rounds. Do not \
             generate them again; find new ones:\n{}\n\n\
             Weigh these considerations from the research so far when choosing the \
             next queries:\n{}",
            previous_queries.join("\n"),
            considerations.join("\n"),
        ));
    }

    system
}

pub const RELEVANCE_SYSTEM: &str = "\
You are a research assistant working over a private document collection.

You are given one or more questions and an excerpt from a document. Judge \
whether the excerpt could help answer the questions.

Notes:
- This is an excerpt, not the complete document.
- The excerpt does not have to answer the questions fully.
- Judge only whether it is potentially helpful.

Answer format:
reasoning: <short justification for your judgement>
relevance: true | false
    - true: the excerpt contains information that can help answer the question(s).
    - false: the excerpt is clearly not relevant.";

pub fn relevance_prompt(question: &str, passage_text: &str) -> String {
    format!(
        "Expert question:\n{question}\n\nExcerpt from a document:\n{passage_text}"
    )
}

pub fn analysis_prompt(question: &str, doc: &Document) -> String {
    format!(
        "You are a research assistant working over a private document collection.\n\
         \n\
         You are given one or more questions and a full document. Analyze the \
         document carefully, extract the information that bears on the question(s), \
         and write a concise summary.\n\
         \n\
         Notes:\n\
         - Consolidate the key facts and findings.\n\
         - Record the source of every statement by quoting the relevant passages \
         and citing any referenced regulations or decisions.\n\
         - The result should be a well-written summary grounded in the document.\n\
         - Use only information from the document; invent nothing.\n\
         \n\
         Expert question(s):\n{question}\n\n\
         Document\n\n\
         Title\n{title}\n\n\
         Date\n{date}\n\n\
         Link\n{link}\n\n\
         Text\n{text}",
        title = doc.title,
        date = doc.date,
        link = doc.link,
        text = doc.text,
    )
}

pub fn reflection_prompt(question: &str, analyses: &str) -> String {
    format!(
        "You are a research assistant working over a private document collection.\n\
         Reflect on the current state of an investigation and decide whether more \
         research rounds are needed or the investigation can close.\n\
         \n\
         Notes:\n\
         - You receive the expert's question(s) and the analyses of every relevant \
         document found so far.\n\
         - Judge whether the findings so far answer the question(s) completely.\n\
         \n\
         Answer format:\n\
         - reflection: <short justification for your judgement>\n\
         - finished: true | false\n\
             - true: the investigation is complete, the questions can be answered.\n\
             - false: further rounds are needed for a complete answer.\n\
         \n\
         Expert question(s):\n{question}\n\n\
         Analyses of the relevant documents found so far:\n{analyses}"
    )
}

pub fn report_prompt(question: &str, research_results: &str) -> String {
    format!(
        "You are a research assistant working over a private document collection.\n\
         Summarize the results of an investigation in a comprehensive, well-structured \
         report. You receive one or more questions and a list of document analyses; \
         produce a research report with precise, well-sourced answers.\n\
         \n\
         Notes:\n\
         - Base your answer(s) exclusively on the researched material, clearly and precisely.\n\
         - Quote every relevant passage, decision number, and regulation exactly and completely.\n\
         - Refer explicitly to concrete sources.\n\
         \n\
         Missing or partial information:\n\
         - If no reliable answer is possible, say so plainly and explain why.\n\
         - If only partial information exists, point that out explicitly.\n\
         \n\
         Formatting:\n\
         - Always write Markdown.\n\
         - Use headings, subheadings, bullet lists, and bold/italic emphasis.\n\
         - Use heading level 2 (##) for main headings.\n\
         - Format list items with dashes (-), never asterisks (*).\n\
         - Link referenced documents inline wherever possible, e.g. [Decision 217](https://records.example/217).\n\
         - Structure longer answers by sub-question.\n\
         \n\
         Report structure:\n\
         1. Summary: short, direct answer(s).\n\
         2. Detailed answer: the full findings of the investigation.\n\
         3. Sources: complete list of all relevant passages, decisions, and regulations.\n\
         \n\
         Constraints:\n\
         - No advice, opinions, or unfounded speculation.\n\
         - State only what the research supports.\n\
         - Start directly with the summary, without preamble.\n\
         - End with section 3; add nothing after it.\n\
         \n\
         Expert question(s):\n{question}\n\n\
         Analyses of the relevant documents:\n{research_results}"
    )
}

/// One accumulated document rendered for the report prompt.
pub fn document_block(doc: &AnalyzedDocument) -> String {
    format!(
        "Document\n{title}\n{date}\n{link}\n{analysis}",
        title = doc.title,
        date = doc.date,
        link = doc.link,
        analysis = doc.analysis,
    )
}

// Output schemas for the structured calls. additionalProperties is disabled
// so strict providers reject stray fields.

pub fn queries_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "queries": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "required": ["queries"],
        "additionalProperties": false
    })
}

pub fn relevance_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "reasoning": { "type": "string" },
            "relevance": { "type": ["boolean", "null"] }
        },
        "required": ["reasoning", "relevance"],
        "additionalProperties": false
    })
}

pub fn reflection_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "reflection": { "type": "string" },
            "finished": { "type": ["boolean", "null"] }
        },
        "required": ["reflection", "finished"],
        "additionalProperties": false
    })
}

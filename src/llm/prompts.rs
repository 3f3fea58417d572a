//! System instructions, response schemas and request builders
//!
//! Schemas use the Gemini schema dialect (upper-case `type` names).

use super::{GenerateRequest, Operation};
use crate::model::Paper;
use serde_json::{json, Value};

const CORPUS_SEPARATOR: &str = "\n\n---\n\n";

const STANDARDIZE_INSTRUCTION: &str = r#"You are an expert academic search strategist. Convert the user's natural-language research question into a keyword query for academic databases and return it in a JSON object.

Build the query as follows:
1. Identify the core concepts of the question.
2. Add 2-3 synonyms or closely related terms for each concept.
3. Group the terms of one concept with OR inside parentheses, join concept groups with AND, and quote multi-word phrases.
4. Keep the query syntactically valid: balanced parentheses and quotes, no trailing operator.

Example: "hellenistic influence on hebrew bible" becomes ("hellenistic influence" OR "hellenism") AND ("hebrew bible" OR "tanakh" OR "old testament").

Output a single JSON object that follows the provided schema."#;

const BROADEN_INSTRUCTION: &str = "You are an expert academic search strategist. A search query returned no results. Broaden it so that it is more likely to match papers while staying on topic: drop very specific terms, replace jargon with common keywords, or use fewer AND operators. Output a single JSON object with the single key \"broadenedQuery\".";

const RELEVANCE_INSTRUCTION: &str = "You are a meticulous research assistant. For every paper in the corpus, judge whether its abstract directly addresses the user's research query. Give a relevance score from 1 (not relevant) to 5 (highly relevant) and a short justification in 'relevanceJustification'. Papers scoring below 3 are not relevant. Output a single JSON object following the provided schema, with an assessment for every paper.";

const SYNTHESIS_INSTRUCTION: &str = r#"You are a research analyst specializing in meta-analysis of academic literature. Using ONLY the provided abstracts, produce a structured analysis of the user's research question: the main points of contention, the key papers, and the stances researchers take. For every point of contention, evaluate every paper in the corpus and list in 'relatedPapers' each relevant paper's DOI with a relevance score from 1 (tangential) to 5 (highly relevant). Do not use outside knowledge. Output only a JSON object that follows the provided schema. Escape any double quote inside a string value with a backslash, including inside quotes taken from papers."#;

const FOLLOW_UP_INSTRUCTION: &str = "You are a research assistant continuing a conversation about an academic topic. The user already has an analysis and asks a follow-up question. Answer using only the provided papers; if they do not contain the answer, say so. Output a JSON object that follows the provided schema.";

fn paper_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "authors": { "type": "ARRAY", "items": { "type": "STRING" } },
            "year": { "type": "INTEGER" },
            "abstract": { "type": "STRING" },
            "doi": { "type": "STRING" },
            "primaryInstitution": { "type": "STRING" }
        },
        "required": ["title", "authors", "year", "abstract", "doi"]
    })
}

fn standardize_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "refinedQuery": {
                "type": "STRING",
                "description": "A concise keyword query for academic databases, using boolean operators and quotes."
            }
        },
        "required": ["refinedQuery"]
    })
}

fn broaden_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "broadenedQuery": {
                "type": "STRING",
                "description": "A broader, simpler version of the input query that is more likely to return results."
            }
        },
        "required": ["broadenedQuery"]
    })
}

fn relevance_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "assessments": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "doi": { "type": "STRING" },
                        "isRelevant": { "type": "BOOLEAN" },
                        "score": { "type": "NUMBER" },
                        "relevanceJustification": {
                            "type": "STRING",
                            "description": "Why the paper is or isn't relevant to the query."
                        }
                    },
                    "required": ["doi", "isRelevant", "score", "relevanceJustification"]
                }
            }
        },
        "required": ["assessments"]
    })
}

fn synthesis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "STRING",
                "description": "High-level summary of the discourse, disagreement and consensus."
            },
            "disagreementScore": {
                "type": "OBJECT",
                "properties": {
                    "score": { "type": "NUMBER", "description": "1 (total consensus) to 10 (total disagreement)." },
                    "qualitative": { "type": "STRING", "description": "Label for the score, e.g. 'High Contention'." }
                },
                "required": ["score", "qualitative"]
            },
            "keyPapers": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "paper": paper_schema(),
                        "rationale": { "type": "STRING" }
                    },
                    "required": ["paper", "rationale"]
                }
            },
            "contentionPoints": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "topic": { "type": "STRING" },
                        "stances": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "id": { "type": "STRING", "description": "Unique id: paper DOI plus a short hash of the quote." },
                                    "summary": { "type": "STRING" },
                                    "quote": { "type": "STRING" },
                                    "paper": paper_schema()
                                },
                                "required": ["id", "summary", "quote", "paper"]
                            }
                        },
                        "relatedPapers": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "doi": { "type": "STRING" },
                                    "relevance": { "type": "NUMBER" }
                                },
                                "required": ["doi", "relevance"]
                            }
                        }
                    },
                    "required": ["topic", "stances", "relatedPapers"]
                }
            },
            "researchGaps": { "type": "ARRAY", "items": { "type": "STRING" } },
            "papers": { "type": "ARRAY", "items": paper_schema() }
        },
        "required": ["summary", "disagreementScore", "keyPapers", "contentionPoints", "researchGaps", "papers"]
    })
}

fn follow_up_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "question": { "type": "STRING" },
            "answer": { "type": "STRING" },
            "sources": { "type": "ARRAY", "items": paper_schema() }
        },
        "required": ["question", "answer", "sources"]
    })
}

/// Papers as Title/Authors/Year/Abstract/DOI blocks
pub fn synthesis_corpus(papers: &[Paper]) -> String {
    papers
        .iter()
        .map(Paper::synthesis_context)
        .collect::<Vec<_>>()
        .join(CORPUS_SEPARATOR)
}

/// Papers as DOI/Abstract blocks
pub fn relevance_corpus(papers: &[Paper]) -> String {
    papers
        .iter()
        .map(|p| format!("DOI: {}\nAbstract: {}", p.doi, p.abstract_text))
        .collect::<Vec<_>>()
        .join(CORPUS_SEPARATOR)
}

pub fn standardize_request(question: &str) -> GenerateRequest {
    GenerateRequest {
        operation: Operation::StandardizeQuery,
        system_instruction: STANDARDIZE_INSTRUCTION.to_string(),
        contents: format!("User question: \"{}\"", question),
        response_schema: standardize_schema(),
        temperature: Some(0.1),
    }
}

pub fn broaden_request(failed_query: &str) -> GenerateRequest {
    GenerateRequest {
        operation: Operation::BroadenQuery,
        system_instruction: BROADEN_INSTRUCTION.to_string(),
        contents: format!(
            "The following academic search query returned zero results: \"{}\". Please provide a broader version of this query.",
            failed_query
        ),
        response_schema: broaden_schema(),
        temperature: Some(0.5),
    }
}

pub fn relevance_request(papers: &[Paper], question: &str) -> GenerateRequest {
    GenerateRequest {
        operation: Operation::AssessRelevance,
        system_instruction: RELEVANCE_INSTRUCTION.to_string(),
        contents: format!(
            "User Query: \"{}\"\n\nPaper Corpus:\n{}",
            question,
            relevance_corpus(papers)
        ),
        response_schema: relevance_schema(),
        temperature: Some(0.1),
    }
}

pub fn synthesis_request(papers: &[Paper], question: &str) -> GenerateRequest {
    GenerateRequest {
        operation: Operation::Synthesize,
        system_instruction: SYNTHESIS_INSTRUCTION.to_string(),
        contents: format!(
            "Research Query: \"{}\"\n\nPaper Abstracts Corpus:\n{}",
            question,
            synthesis_corpus(papers)
        ),
        response_schema: synthesis_schema(),
        temperature: Some(0.2),
    }
}

pub fn follow_up_request(question: &str, original_question: &str, papers: &[Paper]) -> GenerateRequest {
    GenerateRequest {
        operation: Operation::FollowUp,
        system_instruction: FOLLOW_UP_INSTRUCTION.to_string(),
        contents: format!(
            "Original Query: \"{}\"\n\nFollow-up Question: \"{}\"\n\nAvailable Papers:\n{}",
            original_question,
            question,
            synthesis_corpus(papers)
        ),
        response_schema: follow_up_schema(),
        temperature: None,
    }
}

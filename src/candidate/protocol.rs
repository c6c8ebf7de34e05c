//! JSON-lines protocol between the grader and a sandboxed candidate.
//!
//! Every message is one JSON object on one line, tagged by `"type"`.
//!
//! ```text
//! grader → candidate   {"type":"describe"}
//! candidate → grader   {"type":"capabilities","names":["compute_embedding","rank_words_by_similarity"]}
//!
//! grader → candidate   {"type":"rank","target":"cat","words":["cat","dog",...]}
//! candidate → grader   {"type":"embed","word":"cat"}
//! grader → candidate   {"type":"vector","vector":{"kind":"sparse","values":{"a":0.33,...}}}
//! candidate → grader   {"type":"similarity","a":{...},"b":{...}}
//! grader → candidate   {"type":"score","value":0.82}
//! candidate → grader   {"type":"print","text":"debug line"}
//! candidate → grader   {"type":"ranking","ranking":{"cat":1,"dog":2,...}}
//! ```
//!
//! A failed `embed` is answered with `{"type":"failure","message":...}`.
//! The candidate reports its own errors with
//! `{"type":"error","message":...,"trace":...}`. Any stdout line that is not
//! a protocol message is treated as console output.

use crate::vector::VectorRepresentation;
use serde::{Deserialize, Serialize};

/// Messages the grader sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// Ask which capabilities the submission defines
    Describe,
    /// Ask for one ranking
    Rank { target: String, words: Vec<String> },
    /// Answer to `embed`
    Vector { vector: VectorRepresentation },
    /// Answer to `similarity`
    Score { value: f64 },
    /// A capability call could not be served
    Failure { message: String },
}

/// Messages the candidate sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CandidateMessage {
    /// Answer to `describe`
    Capabilities { names: Vec<String> },
    /// Call the embedding capability
    Embed { word: String },
    /// Call the similarity capability
    Similarity {
        a: VectorRepresentation,
        b: VectorRepresentation,
    },
    /// Console output
    Print { text: String },
    /// Final answer to `rank`; any JSON value is accepted here and checked
    /// by the executor
    Ranking { ranking: serde_json::Value },
    /// The candidate failed
    Error {
        message: String,
        #[serde(default)]
        trace: Option<String>,
    },
}

impl CandidateMessage {
    /// Parse one stdout line; `None` for anything that is not a message.
    pub fn parse_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }
}

impl HostMessage {
    /// Serialize as a single protocol line (with trailing newline).
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::SparseVector;

    #[test]
    fn test_describe_line() {
        assert_eq!(
            HostMessage::Describe.to_line().unwrap(),
            "{\"type\":\"describe\"}\n"
        );
    }

    #[test]
    fn test_rank_line() {
        let msg = HostMessage::Rank {
            target: "cat".to_string(),
            words: vec!["dog".to_string()],
        };
        let value: serde_json::Value =
            serde_json::from_str(msg.to_line().unwrap().trim()).unwrap();
        assert_eq!(value["type"], "rank");
        assert_eq!(value["words"][0], "dog");
    }

    #[test]
    fn test_vector_reply_shape() {
        let msg = HostMessage::Vector {
            vector: SparseVector::char_frequencies("aa").into(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["vector"]["kind"], "sparse");
    }

    #[test]
    fn test_parse_candidate_messages() {
        assert_eq!(
            CandidateMessage::parse_line(r#"{"type":"embed","word":"cat"}"#),
            Some(CandidateMessage::Embed {
                word: "cat".to_string()
            })
        );
        let ranking = CandidateMessage::parse_line(r#" {"type":"ranking","ranking":{"cat":1}} "#);
        assert!(matches!(ranking, Some(CandidateMessage::Ranking { .. })));

        let error = CandidateMessage::parse_line(r#"{"type":"error","message":"boom"}"#);
        assert_eq!(
            error,
            Some(CandidateMessage::Error {
                message: "boom".to_string(),
                trace: None
            })
        );
    }

    #[test]
    fn test_non_messages_are_console_output() {
        assert_eq!(CandidateMessage::parse_line("hello world"), None);
        assert_eq!(CandidateMessage::parse_line(r#"{"not":"a message"}"#), None);
        assert_eq!(CandidateMessage::parse_line("{broken"), None);
    }
}

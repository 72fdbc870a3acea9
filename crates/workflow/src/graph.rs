//! Mermaid rendering of the answering state machine.

/// `(from, to, label)` for every edge `transition` can take.
pub const EDGES: &[(&str, &str, &str)] = &[
    ("route", "retrieve", "document retrieval"),
    ("route", "web_search", "web search"),
    ("retrieve", "grade_evidence", ""),
    ("grade_evidence", "generate", "all relevant"),
    ("grade_evidence", "web_search", "any irrelevant"),
    ("web_search", "generate", ""),
    ("generate", "check_groundedness", ""),
    ("check_groundedness", "check_answer", "grounded"),
    ("check_groundedness", "generate", "ungrounded"),
    ("check_answer", "verified", "addresses"),
    ("check_answer", "web_search", "misses, no fallback yet"),
    ("check_answer", "generate", "misses, fallback used"),
    ("check_groundedness", "unverified", "retry bound reached"),
    ("check_answer", "unverified", "retry bound reached"),
];

/// Render the state machine as a Mermaid flowchart.
pub fn mermaid() -> String {
    let mut out = String::from("flowchart TD\n");
    out.push_str("    start([question]) --> route\n");
    for (from, to, label) in EDGES {
        if label.is_empty() {
            out.push_str(&format!("    {} --> {}\n", from, to));
        } else {
            out.push_str(&format!("    {} -->|{}| {}\n", from, label, to));
        }
    }
    out.push_str("    verified([verified])\n");
    out.push_str("    unverified([unverified])\n");
    out
}

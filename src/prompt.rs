pub const PROMPT_TEMPLATE: &str = "\
Use the following pieces of information to answer the user's question.
If you don't know the answer, just say that you don't know, don't try to make up an answer.

Context: {context}
Query: {query}

Only return the helpful answer. Answer must be detailed and well explained.
Helpful answer:";

pub fn format_prompt(context: &str, query: &str) -> String {
    // Context goes in last so braces inside retrieved text are never re-expanded.
    PROMPT_TEMPLATE
        .replacen("{query}", query, 1)
        .replacen("{context}", context, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_both_placeholders() {
        let prompt = format_prompt("Refunds within 30 days.", "What is the refund policy?");
        assert!(prompt.starts_with("Use the following pieces of information"));
        assert!(prompt.contains("Context: Refunds within 30 days.\nQuery: What is the refund policy?\n"));
        assert!(prompt.ends_with("Helpful answer:"));
    }

    #[test]
    fn placeholder_text_in_context_is_left_alone() {
        let prompt = format_prompt("literal {query} here", "q");
        assert!(prompt.contains("Context: literal {query} here"));
        assert!(prompt.contains("Query: q\n"));
    }
}

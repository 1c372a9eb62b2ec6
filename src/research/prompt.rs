use super::state::ExtractedContent;

/// One block per record, in extraction order.
pub fn build_context(contents: &[ExtractedContent]) -> String {
    contents
        .iter()
        .map(|item| {
            format!(
                "Source: {}\nGenerated Query: {}\nContent:\n{}\n\n---\n",
                item.url, item.query, item.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn report_prompt(user_query: &str, context: &str) -> String {
    format!(
        r#"**Original User Query:**
{user_query}

**Context Gathered from Web Search:**
--- START CONTEXT ---
{context}
--- END CONTEXT ---

**Task:**
Craft an exceptionally detailed, comprehensive, and engaging report that directly addresses the original user query. Turn the provided context into a rich narrative that explains each concept in depth and with clarity, so the result is informative and genuinely interesting to read. The report MUST be based exclusively on the "Context Gathered from Web Search" above.

**Instructions:**

1.  **Go Beyond Surface Level:** Do not just summarize. For every topic and sub-topic in the context, elaborate extensively. Explain the 'why' and 'how' behind each piece of information.
2.  **Rich and Engaging Explanations:** Use descriptive language and illustrative details drawn only from the context. Explain the significance and implications of each feature or concept. When the context mentions a benefit, explain how it helps and why it matters.
3.  **Maximum Detail is Key:** Present every relevant detail from the context. Assume the reader wants the most thorough understanding the text allows. Expand on definitions, functionality and comparisons.
4.  **Strict Context Adherence:** Base the entire report on the information in the provided context. Do not introduce external knowledge or examples.
5.  **Logical Structure and Clarity:** Organize the report with clear sections and headings (markdown: # for main headings, ## for subheadings, ### for sub-subheadings) and smooth transitions between topics.
6.  **Source Citation:** Cite the source URL from the context immediately after each piece of information.
7.  **Acknowledge Limitations:** If the context lacks the detail needed for some aspect of the query, say so explicitly.
8.  **Comprehensive Coverage:** Cover every aspect of the original query that the context addresses, in exhaustive detail.
9.  **Markdown Formatting:** Use markdown headings for structure and bold for key terms only where the context emphasizes them; prioritize clear prose.

Generate the deeply detailed and engaging report now."#
    )
}

use std::path::PathBuf;

use serde::{Serialize, Serializer};

/// Query → links, in query generation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults(Vec<(String, Vec<String>)>);

impl SearchResults {
    /// Replaces the links of an existing query in place, else appends.
    pub fn insert(&mut self, query: impl Into<String>, links: Vec<String>) {
        let query = query.into();
        match self.0.iter_mut().find(|(q, _)| *q == query) {
            Some(entry) => entry.1 = links,
            None => self.0.push((query, links)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, query: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(q, _)| q == query)
            .map(|(_, links)| links.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(q, links)| (q.as_str(), links.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn total_links(&self) -> usize {
        self.0.iter().map(|(_, links)| links.len()).sum()
    }
}

impl Serialize for SearchResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(q, links)| (q, links)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedContent {
    pub query: String,
    pub url: String,
    pub content: String,
}

/// Everything one research run produces. Each stage writes its own fields.
#[derive(Debug, Clone, Default)]
pub struct ResearchState {
    user_query: String,
    pub queries: Vec<String>,
    pub search_results: SearchResults,
    pub extracted_contents: Vec<ExtractedContent>,
    pub report: String,
    pub json_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
}

impl ResearchState {
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            ..Self::default()
        }
    }

    pub fn user_query(&self) -> &str {
        &self.user_query
    }

    /// The persisted JSON view of this state.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            initial_query: &self.user_query,
            generated_queries: &self.queries,
            search_results: &self.search_results,
            extracted_contents: &self.extracted_contents,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub initial_query: &'a str,
    pub generated_queries: &'a [String],
    pub search_results: &'a SearchResults,
    pub extracted_contents: &'a [ExtractedContent],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_results_serialize_in_insertion_order() {
        let mut results = SearchResults::default();
        results.insert("zeta", vec!["https://z.com".into()]);
        results.insert("alpha", vec![]);
        results.insert("mid", vec!["https://m.com".into(), "https://n.com".into()]);

        let json = serde_json::to_string(&results).unwrap();
        assert_eq!(
            json,
            r#"{"zeta":["https://z.com"],"alpha":[],"mid":["https://m.com","https://n.com"]}"#
        );
    }

    #[test]
    fn reinserting_a_query_keeps_its_position() {
        let mut results = SearchResults::default();
        results.insert("a", vec!["1".into()]);
        results.insert("b", vec!["2".into()]);
        results.insert("a", vec!["3".into()]);

        let keys: Vec<_> = results.iter().map(|(q, _)| q).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(results.get("a"), Some(&["3".to_string()][..]));
        assert_eq!(results.total_links(), 2);
    }

    #[test]
    fn snapshot_has_persisted_field_names() {
        let mut state = ResearchState::new("What is Rust?");
        state.queries = vec!["rust language".into()];
        state.search_results.insert("rust language", vec!["https://a.com".into()]);
        state.extracted_contents.push(ExtractedContent {
            query: "rust language".into(),
            url: "https://a.com".into(),
            content: "Rust is fast.".into(),
        });
        state.report = "not persisted in JSON".into();

        let value = serde_json::to_value(state.snapshot()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "initial_query": "What is Rust?",
                "generated_queries": ["rust language"],
                "search_results": {"rust language": ["https://a.com"]},
                "extracted_contents": [
                    {"query": "rust language", "url": "https://a.com", "content": "Rust is fast."}
                ]
            })
        );
    }
}

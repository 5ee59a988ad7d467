//! List/detail view configuration.

use serde::{Deserialize, Serialize};

/// Settings shared by the list-filter-detail views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Fields searched by the free-text box on the lead pipeline.
    #[serde(default = "default_lead_fields")]
    pub lead_search_fields: Vec<String>,
    /// Fields searched by the free-text box on business listings.
    #[serde(default = "default_business_fields")]
    pub business_search_fields: Vec<String>,
    /// Fields searched by the free-text box on the agent directory.
    #[serde(default = "default_agent_fields")]
    pub agent_search_fields: Vec<String>,
    /// Rows fetched per load.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Maximum notices kept on the notice board.
    #[serde(default = "default_notice_capacity")]
    pub notice_capacity: usize,
    /// Name of the callable function that emails an inquiry.
    #[serde(default = "default_inquiry_function")]
    pub inquiry_function: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            lead_search_fields: default_lead_fields(),
            business_search_fields: default_business_fields(),
            agent_search_fields: default_agent_fields(),
            page_size: default_page_size(),
            notice_capacity: default_notice_capacity(),
            inquiry_function: default_inquiry_function(),
        }
    }
}

impl ViewConfig {
    /// Free-text search fields configured for a collection, empty for
    /// collections without a search box.
    pub fn search_fields(&self, collection: &str) -> &[String] {
        match collection {
            "leads" => &self.lead_search_fields,
            "businesses" => &self.business_search_fields,
            "agents" => &self.agent_search_fields,
            _ => &[],
        }
    }
}

fn default_lead_fields() -> Vec<String> {
    vec!["name".into(), "email".into(), "company".into()]
}

fn default_business_fields() -> Vec<String> {
    vec!["name".into(), "description".into(), "location".into()]
}

fn default_agent_fields() -> Vec<String> {
    vec!["name".into(), "title".into(), "office".into()]
}

fn default_page_size() -> u64 {
    100
}

fn default_notice_capacity() -> usize {
    20
}

fn default_inquiry_function() -> String {
    "send-inquiry-email".to_string()
}

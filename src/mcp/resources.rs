//! Resource discovery, reading and relevance-based auto-inclusion.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::Result;
use crate::mcp::session::McpSession;
use crate::mcp::types::{ResourceContent, ResourceDescriptor};

/// Characters of resource text kept in the terminal view.
const DISPLAY_TRUNCATE_CHARS: usize = 2000;

/// Knobs for automatic resource inclusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevancePolicy {
    /// Minimum score in `[0, 1]` for a resource to be included.
    ///
    /// A resource must also share at least one token with the query, so a
    /// threshold of `0.0` means "any overlap" rather than "every resource".
    pub threshold: f64,
    /// Upper bound on the number of resources read per query.
    pub max_resources: usize,
    /// Characters of each resource's text kept in the query context.
    pub max_context_chars: usize,
}

impl Default for RelevancePolicy {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            max_resources: 3,
            max_context_chars: 1000,
        }
    }
}

/// A resource picked for a query, with the content that was read.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludedResource {
    pub descriptor: ResourceDescriptor,
    pub score: f64,
    pub contents: Vec<ResourceContent>,
}

#[derive(Debug, Clone)]
pub struct ResourceManager {
    session: Arc<dyn McpSession>,
}

impl ResourceManager {
    pub fn new(session: Arc<dyn McpSession>) -> Self {
        Self { session }
    }

    pub async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>> {
        self.session.list_resources().await
    }

    /// Read a resource. Not cached: every call goes to the server.
    pub async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContent>> {
        self.session.read_resource(uri).await
    }

    /// Read every resource relevant to `query`, most relevant first.
    ///
    /// A resource that fails to read is logged and skipped.
    pub async fn auto_include(
        &self,
        query: &str,
        policy: &RelevancePolicy,
    ) -> Result<Vec<IncludedResource>> {
        let resources = self.list_resources().await?;
        let ranked = rank_resources(query, resources, policy);

        let mut included = Vec::with_capacity(ranked.len());
        for (descriptor, score) in ranked {
            match self.read_resource(&descriptor.uri).await {
                Ok(contents) => included.push(IncludedResource {
                    descriptor,
                    score,
                    contents,
                }),
                Err(e) => {
                    tracing::warn!(
                        name: "mcp.resource.read_failed",
                        uri = %descriptor.uri,
                        error = %e,
                        "Skipping resource that could not be read"
                    );
                }
            }
        }

        tracing::debug!(
            name: "mcp.resource.auto_included",
            count = included.len(),
            "Resources selected for query context"
        );
        Ok(included)
    }

    /// Prefix `query` with the text of relevant resources, or return it unchanged.
    pub async fn add_resource_context(&self, query: &str, policy: &RelevancePolicy) -> Result<String> {
        let included = self.auto_include(query, policy).await?;

        let context_parts: Vec<String> = included
            .iter()
            .flat_map(|res| {
                res.contents.iter().filter_map(move |content| {
                    let text = content.text.as_deref().filter(|t| !t.is_empty())?;
                    Some(format!(
                        "Resource '{}' ({}):\n{}",
                        res.descriptor.name,
                        res.descriptor.uri,
                        truncate(text, policy.max_context_chars, "... (truncated)")
                    ))
                })
            })
            .collect();

        if context_parts.is_empty() {
            return Ok(query.to_string());
        }

        Ok(format!(
            "Here are some relevant resources for context:\n\n{}\n\nUser query: {query}",
            context_parts.join("\n\n")
        ))
    }
}

/// Lowercased alphanumeric tokens.
fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Share of the query's tokens that appear in the resource's name or description.
///
/// Deterministic and case-insensitive. `0.0` when nothing overlaps (or the
/// query has no tokens), `1.0` when every query token is present.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_relevance(query: &str, descriptor: &ResourceDescriptor) -> f64 {
    let query_tokens = tokens(query);
    if query_tokens.is_empty() {
        return 0.0;
    }

    let mut haystack = descriptor.name.clone();
    if let Some(desc) = &descriptor.description {
        haystack.push(' ');
        haystack.push_str(desc);
    }
    let resource_tokens = tokens(&haystack);

    let shared = query_tokens.intersection(&resource_tokens).count();
    shared as f64 / query_tokens.len() as f64
}

/// Resources at or above the threshold, highest score first. Ties keep listing order.
pub fn rank_resources(
    query: &str,
    resources: Vec<ResourceDescriptor>,
    policy: &RelevancePolicy,
) -> Vec<(ResourceDescriptor, f64)> {
    let mut scored: Vec<(ResourceDescriptor, f64)> = resources
        .into_iter()
        .map(|r| {
            let score = compute_relevance(query, &r);
            (r, score)
        })
        .filter(|(_, score)| *score > 0.0 && *score >= policy.threshold)
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(policy.max_resources);
    scored
}

fn truncate(text: &str, max_chars: usize, marker: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{marker}", &text[..idx]),
        None => text.to_string(),
    }
}

/// Numbered listing for the `resources` command.
#[must_use]
pub fn format_resources_list(resources: &[ResourceDescriptor]) -> String {
    if resources.is_empty() {
        return "No resources available.".to_string();
    }

    let mut output = vec![format!("Available Resources ({}):", resources.len())];
    for (i, resource) in resources.iter().enumerate() {
        output.push(format!("{}. {}", i + 1, resource.name));
        output.push(format!("   URI: {}", resource.uri));
        if let Some(description) = &resource.description {
            output.push(format!("   Description: {description}"));
        }
        if let Some(mime) = &resource.mime_type {
            output.push(format!("   MIME Type: {mime}"));
        }
        if let Some(size) = resource.size {
            output.push(format!("   Size: {size} bytes"));
        }
        output.push(String::new());
    }
    output.join("\n")
}

/// Terminal view of a `read <uri>` result.
#[must_use]
pub fn format_resource_contents(contents: &[ResourceContent]) -> String {
    if contents.is_empty() {
        return "No content available.".to_string();
    }

    let rule = "-".repeat(50);
    let mut output = Vec::new();
    for content in contents {
        output.push(format!("Resource: {}", content.uri));
        if let Some(mime) = &content.mime_type {
            output.push(format!("MIME Type: {mime}"));
        }
        match (&content.text, &content.blob) {
            (Some(text), _) if !text.is_empty() => {
                output.push("Content (text):".to_string());
                output.push(rule.clone());
                output.push(truncate(text, DISPLAY_TRUNCATE_CHARS, "\n... (truncated)"));
                output.push(rule.clone());
            }
            (_, Some(blob)) if !blob.is_empty() => {
                output.push("Content (binary - base64 encoded):".to_string());
                output.push(format!("Length: {} characters", blob.len()));
            }
            _ => output.push("No content available.".to_string()),
        }
    }
    output.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(uri: &str, name: &str, description: Option<&str>) -> ResourceDescriptor {
        ResourceDescriptor {
            uri: uri.into(),
            name: name.into(),
            description: description.map(Into::into),
            mime_type: None,
            size: None,
        }
    }

    #[test]
    fn test_relevance_bounds() {
        let r = resource("docs://alerts", "Weather alerts", Some("Active alerts by state"));
        assert_eq!(compute_relevance("stock prices", &r), 0.0);
        assert_eq!(compute_relevance("weather alerts", &r), 1.0);
        assert_eq!(compute_relevance("", &r), 0.0);
    }

    #[test]
    fn test_relevance_is_case_insensitive_and_stable() {
        let r = resource("docs://alerts", "Weather alerts", None);
        let a = compute_relevance("WEATHER in Boston", &r);
        let b = compute_relevance("weather IN boston", &r);
        assert_eq!(a, b);
        assert_eq!(a, compute_relevance("WEATHER in Boston", &r));
        assert!((a - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rank_orders_by_score_then_listing() {
        let resources = vec![
            resource("r://1", "boston weather", None),
            resource("r://2", "weather", None),
            resource("r://3", "boston weather today", None),
            resource("r://4", "recipes", None),
        ];
        let policy = RelevancePolicy {
            threshold: 0.4,
            max_resources: 10,
            max_context_chars: 100,
        };
        let ranked = rank_resources("boston weather", resources, &policy);
        let uris: Vec<&str> = ranked.iter().map(|(r, _)| r.uri.as_str()).collect();
        assert_eq!(uris, ["r://1", "r://3", "r://2"]);
    }

    #[test]
    fn test_rank_respects_max_resources() {
        let resources = (0..5)
            .map(|i| resource(&format!("r://{i}"), "weather", None))
            .collect();
        let ranked = rank_resources("weather", resources, &RelevancePolicy::default());
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn test_default_policy_includes_single_keyword_match() {
        let resources = vec![
            resource("docs://alerts", "Weather alerts", Some("Active weather alerts by US state")),
            resource("docs://recipes", "Recipes", Some("Cooking notes")),
        ];
        let ranked = rank_resources("What's the weather in Boston?", resources, &RelevancePolicy::default());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0.uri, "docs://alerts");
    }

    #[test]
    fn test_zero_threshold_still_needs_overlap() {
        let policy = RelevancePolicy {
            threshold: 0.0,
            ..RelevancePolicy::default()
        };
        let ranked = rank_resources("stock prices", vec![resource("r://1", "weather", None)], &policy);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("héllo", 2, "…"), "hé…");
        assert_eq!(truncate("hi", 5, "…"), "hi");
    }

    #[test]
    fn test_format_resources_list() {
        assert_eq!(format_resources_list(&[]), "No resources available.");
        let listing = format_resources_list(&[resource("r://1", "alerts", Some("NWS alerts"))]);
        assert!(listing.starts_with("Available Resources (1):"));
        assert!(listing.contains("   URI: r://1"));
        assert!(listing.contains("   Description: NWS alerts"));
    }
}

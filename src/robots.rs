//! robots.txt parsing.
//!
//! Implements the subset of the robots exclusion protocol the crawler needs:
//! user-agent groups with Allow/Disallow rules (`*` wildcard and `$` anchor),
//! Crawl-delay, and Sitemap declarations. Malformed lines are skipped; an
//! unparseable or absent file yields the permissive [`RobotsTxt::default`].

use std::collections::HashMap;

use regex::Regex;

#[derive(Debug, Clone)]
struct Rule {
    is_allow: bool,
    path: String,
    regex: Option<Regex>,
}

/// Parsed robots.txt for one host.
#[derive(Debug, Clone, Default)]
pub struct RobotsTxt {
    /// Rules per user-agent token (lowercased), "*" for the catch-all group.
    rules: HashMap<String, Vec<Rule>>,
    /// Crawl-delay per user-agent token, in seconds.
    crawl_delays: HashMap<String, f64>,
    /// Sitemap URLs declared anywhere in the file.
    sitemaps: Vec<String>,
}

impl RobotsTxt {
    pub fn parse(content: &str) -> Self {
        let mut robots = Self::default();

        let mut current_agents: Vec<String> = Vec::new();
        // A Disallow/Allow line before any User-agent applies to nobody.
        let mut in_group = false;

        for line in content.lines() {
            // Strip comments, then whitespace.
            let line = match line.split_once('#') {
                Some((before, _)) => before.trim(),
                None => line.trim(),
            };
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // Consecutive User-agent lines share the group that follows.
                    if in_group {
                        current_agents.clear();
                        in_group = false;
                    }
                    current_agents.push(value.to_lowercase());
                }
                "disallow" | "allow" => {
                    in_group = true;
                    // An empty Disallow means "allow everything": no rule.
                    if value.is_empty() {
                        continue;
                    }
                    let rule = Rule {
                        is_allow: key == "allow",
                        path: value.to_string(),
                        regex: compile_pattern(value),
                    };
                    for agent in &current_agents {
                        robots
                            .rules
                            .entry(agent.clone())
                            .or_default()
                            .push(rule.clone());
                    }
                }
                "crawl-delay" => {
                    in_group = true;
                    if let Ok(delay) = value.parse::<f64>() {
                        if delay >= 0.0 {
                            for agent in &current_agents {
                                robots.crawl_delays.insert(agent.clone(), delay);
                            }
                        }
                    }
                }
                "sitemap" => {
                    // Sitemap is a file-wide directive, independent of groups.
                    if !value.is_empty() {
                        robots.sitemaps.push(value.to_string());
                    }
                }
                _ => {}
            }
        }

        robots
    }

    /// Whether `path` may be fetched by `user_agent`.
    ///
    /// The most specific matching rule (longest pattern) wins; Allow beats
    /// Disallow on equal length. No matching rule means allowed.
    pub fn is_path_allowed(&self, path: &str, user_agent: &str) -> bool {
        let token = user_agent.to_lowercase();
        let rules = self
            .rules
            .get(&token)
            .or_else(|| self.agent_prefix_rules(&token))
            .or_else(|| self.rules.get("*"));

        let Some(rules) = rules else {
            return true;
        };

        let mut best: Option<(&Rule, usize)> = None;
        for rule in rules {
            let matched = match &rule.regex {
                Some(regex) => regex.is_match(path),
                None => path.starts_with(&rule.path),
            };
            if !matched {
                continue;
            }
            let specificity = rule.path.len();
            let wins = match best {
                None => true,
                Some((current, len)) => {
                    specificity > len || (specificity == len && rule.is_allow && !current.is_allow)
                }
            };
            if wins {
                best = Some((rule, specificity));
            }
        }

        best.map(|(rule, _)| rule.is_allow).unwrap_or(true)
    }

    /// Crawl-delay in seconds for `user_agent`, falling back to the product
    /// token and then the `*` group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        let token = user_agent.to_lowercase();
        self.crawl_delays
            .get(&token)
            .or_else(|| {
                let product = token.split('/').next()?;
                self.crawl_delays.get(product)
            })
            .or_else(|| self.crawl_delays.get("*"))
            .copied()
    }

    /// Sitemap URLs declared in the file, in order of appearance.
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    /// Group lookup for product tokens: "seo_audit/0.1" matches a
    /// "User-agent: seo_audit" group.
    fn agent_prefix_rules(&self, token: &str) -> Option<&Vec<Rule>> {
        let product = token.split('/').next()?;
        self.rules.get(product)
    }
}

/// Compiles a robots path pattern with `*` wildcards or a `$` anchor into a
/// regex. Plain prefixes return `None` and use `starts_with` instead.
fn compile_pattern(pattern: &str) -> Option<Regex> {
    if !pattern.contains('*') && !pattern.ends_with('$') {
        return None;
    }
    let mut regex_pattern = regex::escape(pattern);
    regex_pattern = regex_pattern.replace("\\*", ".*");
    if let Some(stripped) = regex_pattern.strip_suffix("\\$") {
        regex_pattern = format!("{}$", stripped);
    }
    Regex::new(&format!("^{}", regex_pattern)).ok()
}

//! Batch orchestration: every matching group is aggregated, fetched, synthesized, and written.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result, bail};
use convert_case::{Case, Casing as _};
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::app::aggregate::{InclusionPatterns, aggregate, strip_non_alpha};
use crate::app::schedule::Scheduler;
use crate::app::source::AssetSource;
use crate::app::synth::synthesize;
use crate::domain::errors::DomainError;
use crate::domain::model::{GenerationOutcome, GroupFailure, RawNode, VariantGroup};
use crate::domain::naming::RenameMap;
use crate::infra::format::SourceFormatter;
use crate::infra::fs::create_and_write;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(?<key>[a-zA-Z]+)\}").expect("placeholder pattern compiles"));

/// Everything a generation run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Node whose children are the candidate groups.
    pub frame: String,
    /// Output directory, may contain `{key}` placeholders.
    pub directory: String,
    /// Component name template such as `{name}Icon`.
    pub component_name: String,
    pub include: Vec<String>,
    pub renames: RenameMap,
    pub current_color: Option<String>,
    /// Fail a group when any of its variants could not be fetched.
    pub fail_on_missing: bool,
}

/// Outcome of a whole run, in group order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub total: usize,
    pub outcomes: Vec<GenerationOutcome>,
    pub failures: Vec<GroupFailure>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// Monotonic per-group progress counter.
#[derive(Debug)]
pub struct Progress {
    total: usize,
    completed: AtomicUsize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
        }
    }

    /// Count one finished group, successful or not, and return the new count.
    pub fn increment(&self) -> usize {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

/// Drives aggregation, scheduling, synthesis, and persistence for every matching group.
pub struct Generator {
    source: Arc<dyn AssetSource>,
    scheduler: Scheduler,
    formatter: SourceFormatter,
}

impl Generator {
    pub fn new(
        source: Arc<dyn AssetSource>,
        scheduler: Scheduler,
        formatter: SourceFormatter,
    ) -> Self {
        Self {
            source,
            scheduler,
            formatter,
        }
    }

    /// Run the batch. Only frame retrieval and pattern compilation can fail the whole run.
    pub async fn run(&self, request: &GenerateRequest) -> Result<BatchReport> {
        let patterns = InclusionPatterns::new(&request.include)?;

        tracing::info!(frame = %request.frame, "fetching frame children");
        let children = self
            .source
            .fetch_group_children(&request.frame)
            .await
            .with_context(|| format!("failed to fetch children of frame {}", request.frame))?;

        let groups = patterns.filter(&children);
        tracing::info!("found {} matching icons", groups.len());

        let progress = Progress::new(groups.len());
        let tasks = groups.iter().map(|node| {
            let progress = &progress;
            let patterns = &patterns;
            async move {
                let result = self.generate_group(node, patterns, request).await;
                let completed = progress.increment();
                match &result {
                    Ok(outcome) => tracing::info!(
                        completed,
                        total = progress.total(),
                        component = %outcome.component_name,
                        "generated"
                    ),
                    Err(err) => {
                        let reason = format!("{err:#}");
                        tracing::error!(
                            completed,
                            total = progress.total(),
                            group = %node.name,
                            error = %reason,
                            "generation failed"
                        );
                    }
                }
                (node, result)
            }
        });

        let mut report = BatchReport {
            total: groups.len(),
            ..BatchReport::default()
        };
        for (node, result) in join_all(tasks).await {
            match result {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(err) => report.failures.push(GroupFailure {
                    group: node.name.clone(),
                    reason: format!("{err:#}"),
                }),
            }
        }
        Ok(report)
    }

    async fn generate_group(
        &self,
        node: &RawNode,
        patterns: &InclusionPatterns,
        request: &GenerateRequest,
    ) -> Result<GenerationOutcome> {
        let group = aggregate(node, patterns, &request.renames)?;

        let component_name = fill_template(&request.component_name, &group)?;
        let file_name = format!("{}.tsx", component_name.to_case(Case::Kebab));
        let file_path = PathBuf::from(fill_template(&request.directory, &group)?).join(file_name);

        let urls = self.scheduler.resolve_urls(&group).await?;
        let results = self.scheduler.run(&group, &urls).await;
        let synthesis = synthesize(&group, &component_name, &results);

        if !synthesis.skipped.is_empty() {
            let lost: Vec<String> = synthesis
                .skipped
                .iter()
                .map(|skipped| {
                    format!(
                        "[{}] {} ({})",
                        skipped.node_id, skipped.attributes, skipped.reason
                    )
                })
                .collect();
            if request.fail_on_missing {
                bail!("missing variants: {}", lost.join(", "));
            }
            tracing::warn!(
                component = %component_name,
                missing = %lost.join(", "),
                "generated without some variants"
            );
        }
        if synthesis.component.branches.is_empty() && !group.variants.is_empty() {
            bail!("none of the {} variants could be fetched", group.variants.len());
        }

        let mut source_text = synthesis.source_text();
        if let Some(color) = &request.current_color {
            source_text = apply_current_color(&source_text, color);
        }
        let source_text = self.formatter.format(source_text, &file_path).await?;
        create_and_write(&file_path, &source_text).await?;

        Ok(GenerationOutcome {
            component_name,
            prop_variants: synthesis.prop_variants,
            source_text,
            file_path,
            skipped: synthesis.skipped,
        })
    }
}

/// Replace `{key}` placeholders with the group's identity captures, stripped to letters.
///
/// `{name}` falls back to the resolved group name when the pattern has no `name` capture.
pub fn fill_template(template: &str, group: &VariantGroup) -> Result<String, DomainError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for captures in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(key)) = (captures.get(0), captures.name("key")) else {
            continue;
        };
        // An empty `name` capture counts as absent.
        let capture = group
            .matches
            .get(key.as_str())
            .filter(|value| key.as_str() != "name" || !value.is_empty());
        let value = match capture {
            Some(value) => strip_non_alpha(value),
            None if key.as_str() == "name" => group.resolved_name.clone(),
            None => {
                return Err(DomainError::UnknownTemplateKey {
                    key: key.as_str().to_owned(),
                    group: group.raw_name.clone(),
                });
            }
        };
        out.push_str(&template[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }

    out.push_str(&template[last..]);
    Ok(out)
}

/// Point hard-coded stroke and fill colors at `currentColor`.
pub fn apply_current_color(source: &str, color: &str) -> String {
    source
        .replace(&format!("stroke=\"{color}\""), "stroke=\"currentColor\"")
        .replace(&format!("fill=\"{color}\""), "fill=\"currentColor\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, pattern: &str) -> VariantGroup {
        let patterns = InclusionPatterns::new([pattern]).unwrap();
        aggregate(&RawNode::new("1:1", name), &patterns, &RenameMap::new()).unwrap()
    }

    #[test]
    fn fills_placeholders_from_captures() {
        let group = group(
            "Icons/arrows/name=Arrow-Left",
            r"Icons/(?<category>\w+)/name=(?<name>[\w-]+)",
        );
        assert_eq!(fill_template("{name}Icon", &group).unwrap(), "ArrowLeftIcon");
        assert_eq!(
            fill_template("src/icons/{category}", &group).unwrap(),
            "src/icons/arrows"
        );
        assert_eq!(fill_template("plain", &group).unwrap(), "plain");
    }

    #[test]
    fn name_falls_back_to_resolved_name() {
        let group = group("Star 24", "^Star");
        assert_eq!(fill_template("{name}", &group).unwrap(), "Star");
    }

    #[test]
    fn empty_name_capture_uses_resolved_name() {
        let group = group("Icon Star", r"^Icon(?<name>\d*)");
        assert_eq!(fill_template("{name}Icon", &group).unwrap(), "IconStarIcon");
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let group = group("name=Star", r"name=(?<name>\w+)");
        let err = fill_template("{size}/{name}", &group).unwrap_err();
        assert_eq!(
            err,
            DomainError::UnknownTemplateKey {
                key: "size".into(),
                group: "name=Star".into(),
            }
        );
    }

    #[test]
    fn current_color_rewrites_stroke_and_fill() {
        let source = r##"<path stroke="#111" fill="#111" stopColor="#111" />"##;
        assert_eq!(
            apply_current_color(source, "#111"),
            r##"<path stroke="currentColor" fill="currentColor" stopColor="#111" />"##
        );
    }

    #[test]
    fn progress_counts_monotonically() {
        let progress = Progress::new(3);
        assert_eq!(progress.increment(), 1);
        assert_eq!(progress.increment(), 2);
        assert_eq!(progress.completed(), 2);
        assert_eq!(progress.total(), 3);
    }
}

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use iconforge::app::export::{ExportOptions, Exporter};
use iconforge::app::generate::{BatchReport, GenerateRequest, Generator};
use iconforge::app::schedule::{DispatchLimiter, Scheduler};
use iconforge::app::source::AssetSource;
use iconforge::domain::model::RawNode;
use iconforge::domain::naming::RenameMap;
use iconforge::infra::format::SourceFormatter;
use iconforge::infra::svg::SvgJsx;

const FRAME: &str = "0:1";

/// In-memory Figma file. Nodes without an svg entry render to a null URL.
struct FakeFigma {
    children: Vec<RawNode>,
    svgs: HashMap<String, String>,
    delays: HashMap<String, Duration>,
}

impl FakeFigma {
    fn new() -> Self {
        let children = vec![
            RawNode::new("1:1", "Icon / name=Star, Size=Large").with_children(vec![
                RawNode::new("1:2", "Size=Large"),
                RawNode::new("1:3", "Size=Small"),
            ]),
            RawNode::new("9:1", "Logo"),
            RawNode::new("2:1", "Icon / name=Lock").with_children(vec![
                RawNode::new("2:2", "Disabled=true"),
                RawNode::new("2:3", "Disabled=false"),
            ]),
            RawNode::new("3:1", "Icon / name=Broken")
                .with_children(vec![RawNode::new("3:2", "Size=Large, Dark")]),
        ];

        let svgs = [
            ("1:2", "large", "#111"),
            ("1:3", "small", "#111"),
            ("2:2", "locked", "#222"),
        ]
        .into_iter()
        .map(|(id, name, color)| {
            (
                id.to_string(),
                format!(
                    r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="{name}" stroke="{color}"/></svg>"#
                ),
            )
        })
        .collect();

        // The first variant finishes last.
        let delays = HashMap::from([("1:2".to_string(), Duration::from_millis(60))]);

        Self {
            children,
            svgs,
            delays,
        }
    }
}

#[async_trait]
impl AssetSource for FakeFigma {
    async fn fetch_group_children(&self, group_id: &str) -> Result<Vec<RawNode>> {
        if group_id == FRAME {
            Ok(self.children.clone())
        } else {
            Err(anyhow!("node {group_id} not found"))
        }
    }

    async fn fetch_asset_urls(&self, node_ids: &[String]) -> Result<HashMap<String, Option<String>>> {
        Ok(node_ids
            .iter()
            .map(|id| {
                let url = self.svgs.contains_key(id).then(|| format!("mem://{id}"));
                (id.clone(), url)
            })
            .collect())
    }

    async fn fetch_asset_content(&self, url: &str) -> Result<String> {
        let id = url.trim_start_matches("mem://");
        if let Some(delay) = self.delays.get(id) {
            tokio::time::sleep(*delay).await;
        }
        self.svgs
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("404 for {url}"))
    }
}

fn generator() -> Generator {
    let source = Arc::new(FakeFigma::new());
    let limiter = Arc::new(DispatchLimiter::new(4, Duration::ZERO));
    let scheduler = Scheduler::new(source.clone(), Arc::new(SvgJsx::new()), limiter);
    Generator::new(source, scheduler, SourceFormatter::default())
}

fn request(directory: &Path) -> GenerateRequest {
    GenerateRequest {
        frame: FRAME.into(),
        directory: directory.display().to_string(),
        component_name: "{name}Icon".into(),
        include: vec![r"name=(?<name>\w+)".into()],
        renames: RenameMap::new(),
        current_color: None,
        fail_on_missing: false,
    }
}

async fn run(request: &GenerateRequest) -> BatchReport {
    generator().run(request).await.expect("batch runs")
}

#[tokio::test]
async fn generates_matching_groups_and_isolates_failures() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let directory = temp.path().join("icons");
    let report = run(&request(&directory)).await;

    assert_eq!(report.total, 3);
    assert_eq!(report.success_count(), 2);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.failures[0].group, "Icon / name=Broken");
    assert!(report.failures[0].reason.contains("malformed variant label"));

    let names: Vec<_> = report
        .outcomes
        .iter()
        .map(|outcome| outcome.component_name.as_str())
        .collect();
    assert_eq!(names, vec!["StarIcon", "LockIcon"]);

    let star_path = directory.join("star-icon.tsx");
    assert_eq!(report.outcomes[0].file_path, star_path);
    let star = fs::read_to_string(&star_path)?;
    assert!(star.contains("export interface StarIconProps {"));
    assert!(star.contains("size: \"Large\" | \"Small\";"));
    let large = star.find("if (size === \"Large\")").expect("large branch");
    let small = star.find("if (size === \"Small\")").expect("small branch");
    assert!(large < small);
    assert!(star.contains("<path d=\"large\" stroke=\"#111\" />"));
    assert!(star.contains("{...props}>"));
    assert_eq!(
        report.outcomes[0].prop_variants,
        vec!["size=\"Large\"", "size=\"Small\""]
    );

    let lock = &report.outcomes[1];
    assert!(lock.source_text.contains("disabled?: boolean;"));
    assert!(lock.source_text.contains("if (disabled) {"));
    assert!(!lock.source_text.contains("if (!disabled) {"));
    assert_eq!(lock.skipped.len(), 1);
    assert_eq!(lock.skipped[0].node_id, "2:3");
    assert!(!directory.join("broken-icon.tsx").exists());
    Ok(())
}

#[tokio::test]
async fn strict_mode_fails_groups_with_missing_variants() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let mut request = request(&temp.path().join("icons"));
    request.fail_on_missing = true;

    let report = run(&request).await;
    assert_eq!(report.success_count(), 1);
    assert_eq!(report.failure_count(), 2);
    let lock = report
        .failures
        .iter()
        .find(|failure| failure.group == "Icon / name=Lock")
        .expect("lock failure");
    assert!(lock.reason.contains("2:3"));
    Ok(())
}

#[tokio::test]
async fn current_color_and_renames_are_applied() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let mut request = request(&temp.path().join("icons"));
    request.current_color = Some("#111".into());
    request.renames.insert("Small".into(), "Compact".into());

    let report = run(&request).await;
    let star = &report.outcomes[0];
    assert!(star.source_text.contains("stroke=\"currentColor\""));
    assert!(!star.source_text.contains("#111"));
    assert!(star.source_text.contains("size: \"Large\" | \"Compact\";"));
    Ok(())
}

#[tokio::test]
async fn unknown_frame_fails_the_run() {
    let temp = tempfile::tempdir().unwrap();
    let mut request = request(temp.path());
    request.frame = "404:1".into();
    assert!(generator().run(&request).await.is_err());
}

#[tokio::test]
async fn index_lists_successful_components() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let directory = temp.path().join("icons");
    let request = request(&directory);
    let report = run(&request).await;

    let options = ExportOptions {
        write_index: true,
        write_storybook: true,
        storybook_title: "Icons".into(),
        storybook_grid: "32px".into(),
    };
    Exporter::new()?
        .export(
            &request.directory,
            &report.outcomes,
            &options,
            &SourceFormatter::default(),
        )
        .await?;

    let index = fs::read_to_string(directory.join("index.ts"))?;
    assert_eq!(
        index,
        "export { StarIcon } from \"./star-icon\";\nexport { LockIcon } from \"./lock-icon\";\n"
    );
    let stories = fs::read_to_string(directory.join("__stories__/icons.stories.tsx"))?;
    assert!(stories.contains("<StarIcon size=\"Small\" />"));
    assert!(stories.contains("<LockIcon disabled />"));
    Ok(())
}

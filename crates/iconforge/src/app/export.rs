//! Index and Storybook artifacts for a finished batch.

use std::path::{Component, Path, PathBuf};

use anyhow::{Result, anyhow};
use minijinja::Environment;
use serde::Serialize;

use crate::domain::model::GenerationOutcome;
use crate::infra::config::OutputSettings;
use crate::infra::format::SourceFormatter;
use crate::infra::fs::create_and_write;

const INDEX_FILE: &str = "index.ts";
const STORIES_DIR: &str = "__stories__";
const STORIES_FILE: &str = "icons.stories.tsx";

/// Runtime options controlling which artifacts are written.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub write_index: bool,
    pub write_storybook: bool,
    pub storybook_title: String,
    pub storybook_grid: String,
}

impl ExportOptions {
    /// Build options from configuration defaults.
    pub fn from_settings(settings: &OutputSettings) -> Self {
        Self {
            write_index: settings.write_index(),
            write_storybook: settings.write_storybook(),
            storybook_title: settings.storybook_title().to_owned(),
            storybook_grid: settings.storybook_grid().to_owned(),
        }
    }
}

/// Renders batch-level artifacts from successful outcomes.
pub struct Exporter {
    env: Environment<'static>,
}

impl Exporter {
    /// Create a new exporter with built-in templates loaded.
    pub fn new() -> Result<Self> {
        Ok(Self {
            env: default_environment()?,
        })
    }

    /// `export { X } from "./x";` lines for every component under `root`.
    pub fn render_index(&self, root: &Path, outcomes: &[GenerationOutcome]) -> Result<String> {
        let context = TemplateContext {
            components: template_components(root, outcomes),
            title: String::new(),
            grid: String::new(),
        };
        self.render("index", &context)
    }

    /// A story rendering every emitted variant of every component in a grid.
    pub fn render_storybook(
        &self,
        root: &Path,
        outcomes: &[GenerationOutcome],
        options: &ExportOptions,
    ) -> Result<String> {
        let context = TemplateContext {
            components: template_components(root, outcomes),
            title: options.storybook_title.clone(),
            grid: options.storybook_grid.clone(),
        };
        self.render("storybook", &context)
    }

    /// Write the enabled artifacts below the static part of `directory` and return their paths.
    pub async fn export(
        &self,
        directory: &str,
        outcomes: &[GenerationOutcome],
        options: &ExportOptions,
        formatter: &SourceFormatter,
    ) -> Result<Vec<PathBuf>> {
        let root = output_root(directory);
        let mut written = Vec::new();

        if options.write_index {
            let path = root.join(INDEX_FILE);
            let rendered = self.render_index(&root, outcomes)?;
            let formatted = formatter.format(rendered, &path).await?;
            create_and_write(&path, &formatted).await?;
            written.push(path);
        }

        if options.write_storybook {
            let path = root.join(STORIES_DIR).join(STORIES_FILE);
            let rendered = self.render_storybook(&root, outcomes, options)?;
            let formatted = formatter.format(rendered, &path).await?;
            create_and_write(&path, &formatted).await?;
            written.push(path);
        }

        Ok(written)
    }

    fn render(&self, template_name: &str, context: &TemplateContext) -> Result<String> {
        self.env
            .get_template(template_name)
            .and_then(|template| template.render(context))
            .map_err(|err| anyhow!("failed to render template '{template_name}': {err}"))
    }
}

fn default_environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template("index", INDEX_TEMPLATE)
        .map_err(|err| anyhow!("failed to register index template: {err}"))?;
    env.add_template("storybook", STORYBOOK_TEMPLATE)
        .map_err(|err| anyhow!("failed to register storybook template: {err}"))?;
    Ok(env)
}

/// Leading path components of a directory template that contain no `{key}` placeholder.
pub fn output_root(directory: &str) -> PathBuf {
    Path::new(directory)
        .components()
        .take_while(|component| match component {
            Component::Normal(part) => !part.to_string_lossy().contains('{'),
            _ => true,
        })
        .collect()
}

/// Import specifier of `file` relative to `root`, without extension and with `/` separators.
fn module_path(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file).with_extension("");
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn template_components(root: &Path, outcomes: &[GenerationOutcome]) -> Vec<TemplateComponent> {
    outcomes
        .iter()
        .map(|outcome| TemplateComponent {
            name: outcome.component_name.clone(),
            module: module_path(root, &outcome.file_path),
            variants: outcome.prop_variants.clone(),
        })
        .collect()
}

#[derive(Serialize)]
struct TemplateContext {
    components: Vec<TemplateComponent>,
    title: String,
    grid: String,
}

#[derive(Serialize)]
struct TemplateComponent {
    name: String,
    module: String,
    variants: Vec<String>,
}

const INDEX_TEMPLATE: &str = r#"{% for component in components %}
export { {{ component.name }} } from "./{{ component.module }}";
{% endfor %}
"#;

const STORYBOOK_TEMPLATE: &str = r#"import React from 'react';
{% for component in components %}
import { {{ component.name }} } from "../{{ component.module }}";
{% endfor %}

export const Icons = () => (
    <div
        style={{ "{{" }}
            display: "grid",
            gridTemplateColumns: "repeat(auto-fit, minmax({{ grid }}, 1fr))",
            gridAutoRows: "{{ grid }}",
        {{ "}}" }}
    >
{% for component in components %}
{% for variant in component.variants %}
        <{{ component.name }}{% if variant %} {{ variant }}{% endif %} />
{% endfor %}
{% endfor %}
    </div>
);

export default {
    title: "{{ title }}",
};
"#;
